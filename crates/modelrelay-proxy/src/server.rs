//! TCP listener loop for the model router.
//!
//! This module provides the `serve()` function that runs the router using a
//! pre-bound `TcpListener` (from the supervisor). Every accepted connection
//! gets its own task, which frames one request, routes it, and forwards it.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Client;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use modelrelay_core::{ModelRegistry, RouterSettings};

use crate::forward::{ForwardError, forward_to_provider, relay_to_managed};
use crate::framing::{FramingError, FramingLimits, read_request};
use crate::listing::serve_models;
use crate::response::write_error_response;
use crate::routing::{RoutingDecision, decide};

/// Shared state for every connection task.
#[derive(Debug)]
pub struct RouterState {
    settings: RouterSettings,
    registry: Arc<ModelRegistry>,
    /// Client for external providers, bounded by the upstream timeout.
    http: Client,
    /// Client for the managed backend's model listing.
    listing: Client,
}

impl RouterState {
    /// Build router state, creating the outbound HTTP clients.
    pub fn new(settings: RouterSettings, registry: Arc<ModelRegistry>) -> reqwest::Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(10)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.upstream_timeout)
            .build()?;
        let listing = Client::builder().timeout(settings.connect_timeout).build()?;

        Ok(Self {
            settings,
            registry,
            http,
            listing,
        })
    }

    pub const fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub const fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }
}

/// Run the router on a pre-bound listener until `cancel` fires.
///
/// Stopping cancels in-flight connections too; the function returns once
/// every connection task has finished.
pub async fn serve(
    listener: TcpListener,
    state: Arc<RouterState>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        "Router listening on {addr}, managed backend at {}",
        state.settings.managed_authority()
    );
    info!("Point OpenAI-compatible clients at: http://{addr}/v1");

    let tracker = TaskTracker::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let state = Arc::clone(&state);
                    let cancel = cancel.clone();
                    tracker.spawn(async move {
                        tokio::select! {
                            () = handle_connection(stream, peer, &state) => {}
                            () = cancel.cancelled() => {
                                debug!(%peer, "Connection dropped on shutdown");
                            }
                        }
                    });
                }
                Err(e) => {
                    // Per-connection accept failures (e.g. fd exhaustion) are not fatal.
                    warn!(error = %e, "Failed to accept connection");
                }
            },
        }
    }

    tracker.close();
    tracker.wait().await;
    info!("Router shut down");
    Ok(())
}

/// Handle one connection: frame, route, forward.
async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, state: &RouterState) {
    let limits = FramingLimits::from(&state.settings);
    let request = match read_request(&mut stream, limits).await {
        Ok(request) => request,
        Err(FramingError::ConnectionClosed) => {
            debug!(%peer, "Connection closed before a request arrived");
            return;
        }
        Err(e) => {
            debug!(%peer, error = %e, "Dropping connection: framing error");
            return;
        }
    };

    let decision = decide(&request, &state.registry);
    debug!(
        %peer,
        method = %request.method,
        path = %request.path(),
        body_bytes = request.body.len(),
        route = decision.label(),
        "Routing request"
    );

    let result = match &decision {
        RoutingDecision::Models => serve_models(
            &mut stream,
            &state.listing,
            &state.settings.managed_base_url(),
            &state.registry,
        )
        .await
        .map_err(ForwardError::Relay),
        RoutingDecision::Managed => {
            relay_to_managed(
                &mut stream,
                &request,
                &state.settings.managed_authority(),
                state.settings.connect_timeout,
            )
            .await
        }
        RoutingDecision::External(route) => {
            forward_to_provider(&mut stream, &state.http, route, &request).await
        }
    };

    match result {
        Ok(bytes) => debug!(%peer, route = decision.label(), bytes, "Request completed"),
        Err(e) => match e.response_status() {
            Some(status) => {
                warn!(%peer, route = decision.label(), status, error = %e, "Upstream failed");
                if let Err(write_err) =
                    write_error_response(&mut stream, status, &e.to_error_response()).await
                {
                    debug!(%peer, error = %write_err, "Failed to write error response");
                }
            }
            None => debug!(%peer, route = decision.label(), error = %e, "Connection ended early"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelrelay_core::ProviderDirectory;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn start(settings: RouterSettings) -> (SocketAddr, CancellationToken, tokio::task::JoinHandle<anyhow::Result<()>>) {
        let registry = Arc::new(ModelRegistry::new(Arc::new(ProviderDirectory::new())));
        let state = Arc::new(RouterState::new(settings, registry).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, state, cancel.clone()));
        (addr, cancel, handle)
    }

    #[tokio::test]
    async fn test_malformed_request_closes_without_response() {
        let (addr, cancel, handle) = start(RouterSettings::default()).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"NONSENSE\r\n\r\n").await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_managed_backend_yields_502() {
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = dead.local_addr().unwrap().port();
        drop(dead);

        let settings = RouterSettings {
            managed_port: dead_port,
            ..RouterSettings::default()
        };
        let (addr, cancel, handle) = start(settings).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"POST /v1/chat/completions HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}")
            .await
            .unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 502 Bad Gateway\r\n"), "{response}");
        assert!(response.contains("\"type\":\"upstream_error\""));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_listener() {
        let (addr, cancel, handle) = start(RouterSettings::default()).await;
        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
