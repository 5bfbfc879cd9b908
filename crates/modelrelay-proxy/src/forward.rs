//! Request forwarding to the managed backend and to external providers.
//!
//! Both paths race their upstream work against the client connection: if the
//! client goes away, the outbound connection or request is dropped at once.

use std::io;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use modelrelay_core::ProviderRoute;

use crate::framing::InboundRequest;
use crate::models::ErrorResponse;
use crate::response::status_line;

/// Response headers that must NOT be mirrored (hop-by-hop headers).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Check if a response header should be mirrored to the client.
fn should_mirror_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !HOP_BY_HOP_HEADERS.contains(&lower.as_str())
}

/// Errors from either forwarding path.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The managed backend refused or failed the connection.
    #[error("Failed to connect to managed backend: {0}")]
    Connect(#[source] io::Error),

    /// The managed backend did not accept the connection in time.
    #[error("Timed out connecting to managed backend after {0:?}")]
    ConnectTimeout(Duration),

    /// Writing the request to the managed backend failed.
    #[error("Failed to send request to managed backend: {0}")]
    Send(#[source] io::Error),

    /// The external request failed before a response arrived.
    #[error("External provider request failed: {0}")]
    Upstream(#[source] reqwest::Error),

    /// The inbound method is not a valid HTTP method token.
    #[error("Invalid request method: {0}")]
    InvalidMethod(String),

    /// The external response body failed mid-stream.
    #[error("External response stream failed: {0}")]
    Stream(#[source] reqwest::Error),

    /// Relaying bytes failed after the response started.
    #[error("Relay failed: {0}")]
    Relay(#[source] io::Error),

    /// The client disconnected while the request was in flight.
    #[error("Client disconnected")]
    ClientGone,
}

impl ForwardError {
    /// Status the router should answer with, if nothing was written yet.
    ///
    /// `None` means the connection should just be closed, either because
    /// response bytes already reached the client or because it is gone.
    pub const fn response_status(&self) -> Option<u16> {
        match self {
            Self::Connect(_) | Self::ConnectTimeout(_) | Self::Send(_) | Self::Upstream(_) => {
                Some(502)
            }
            Self::InvalidMethod(_) => Some(400),
            Self::Stream(_) | Self::Relay(_) | Self::ClientGone => None,
        }
    }

    /// OpenAI-style body for [`Self::response_status`].
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::InvalidMethod(_) => ErrorResponse::invalid_request(&self.to_string()),
            _ => ErrorResponse::upstream_error(&self.to_string()),
        }
    }
}

/// Resolves once the client connection fails on the read side.
///
/// EOF only means the client half-closed after sending its request; it may
/// still be reading, so the watcher goes quiet instead of resolving. A client
/// that closed fully is caught when the relay's next write fails. Any bytes
/// the client sends after its request are discarded.
async fn client_gone<R>(reader: &mut R)
where
    R: AsyncRead + Unpin,
{
    let mut scratch = [0u8; 1024];
    loop {
        match reader.read(&mut scratch).await {
            Ok(0) => return std::future::pending().await,
            Err(_) => return,
            Ok(_) => {}
        }
    }
}

// =============================================================================
// Managed backend
// =============================================================================

/// Rebuild the request head for the managed backend.
///
/// Headers keep their order and spelling; `Host` is replaced by the managed
/// authority and `Connection` is forced to `close`.
pub fn managed_request_head(request: &InboundRequest, authority: &str) -> String {
    let mut head = format!("{} {} HTTP/1.1\r\n", request.method, request.target);
    for (name, value) in request.headers.iter() {
        if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("connection") {
            continue;
        }
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("Host: ");
    head.push_str(authority);
    head.push_str("\r\nConnection: close\r\n\r\n");
    head
}

/// Relay `request` to the managed backend and copy its response verbatim.
///
/// The managed response is never parsed: whatever bytes arrive are written to
/// the client in order until the managed side closes.
///
/// # Returns
///
/// Number of response bytes relayed.
pub async fn relay_to_managed(
    client: &mut TcpStream,
    request: &InboundRequest,
    authority: &str,
    connect_timeout: Duration,
) -> Result<u64, ForwardError> {
    let mut upstream = tokio::time::timeout(connect_timeout, TcpStream::connect(authority))
        .await
        .map_err(|_| ForwardError::ConnectTimeout(connect_timeout))?
        .map_err(ForwardError::Connect)?;

    debug!(%authority, "Connected to managed backend");

    let head = managed_request_head(request, authority);
    upstream
        .write_all(head.as_bytes())
        .await
        .map_err(ForwardError::Send)?;
    upstream
        .write_all(&request.body)
        .await
        .map_err(ForwardError::Send)?;
    upstream.flush().await.map_err(ForwardError::Send)?;

    let (mut client_rd, mut client_wr) = client.split();

    tokio::select! {
        copied = relay_bytes(&mut upstream, &mut client_wr) => copied,
        () = client_gone(&mut client_rd) => Err(ForwardError::ClientGone),
    }
}

async fn relay_bytes<R, W>(upstream: &mut R, client: &mut W) -> Result<u64, ForwardError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = tokio::io::copy(upstream, client)
        .await
        .map_err(ForwardError::Relay)?;
    client.flush().await.map_err(ForwardError::Relay)?;
    // The client may already have hung up; nothing left to deliver either way.
    let _ = client.shutdown().await;
    Ok(copied)
}

// =============================================================================
// External providers
// =============================================================================

/// Build the provider URL for an inbound target.
///
/// The inbound `/v1` prefix is dropped because provider base URLs already
/// carry their own version segment.
pub fn provider_url(base_url: &str, target: &str) -> String {
    let rest = match target.strip_prefix("/v1") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') => rest,
        _ => target,
    };
    format!("{}{rest}", base_url.trim_end_matches('/'))
}

/// Forward `request` to an external provider and stream its response back.
///
/// Writes the provider's status line and headers (minus hop-by-hop ones),
/// then the body chunks in arrival order, then closes.
///
/// # Returns
///
/// Number of body bytes relayed.
pub async fn forward_to_provider(
    client: &mut TcpStream,
    http: &Client,
    route: &ProviderRoute,
    request: &InboundRequest,
) -> Result<u64, ForwardError> {
    let method = reqwest::Method::from_bytes(request.method.as_bytes())
        .map_err(|_| ForwardError::InvalidMethod(request.method.clone()))?;
    let url = provider_url(&route.base_url, &request.target);

    debug!(provider = %route.id, %url, %method, "Forwarding to external provider");

    let mut builder = http
        .request(method, &url)
        .header(AUTHORIZATION, format!("Bearer {}", route.api_key))
        .header(CONTENT_TYPE, "application/json");
    if let Some(accept) = request.headers.get("accept") {
        builder = builder.header(ACCEPT, accept);
    }
    let pending = builder.body(request.body.clone()).send();

    let (mut client_rd, mut client_wr) = client.split();

    let exchange = async {
        let response = pending.await.map_err(ForwardError::Upstream)?;
        stream_response(response, &mut client_wr).await
    };

    tokio::select! {
        relayed = exchange => relayed,
        () = client_gone(&mut client_rd) => Err(ForwardError::ClientGone),
    }
}

/// Serialize the provider's status line and mirrored headers.
fn response_head(response: &reqwest::Response) -> Vec<u8> {
    let mut head = status_line(response.status().as_u16()).into_bytes();
    for (name, value) in response.headers() {
        if !should_mirror_header(name.as_str()) {
            continue;
        }
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"Connection: close\r\n\r\n");
    head
}

async fn stream_response<W>(response: reqwest::Response, client: &mut W) -> Result<u64, ForwardError>
where
    W: AsyncWrite + Unpin,
{
    let status = response.status();
    client
        .write_all(&response_head(&response))
        .await
        .map_err(ForwardError::Relay)?;
    client.flush().await.map_err(ForwardError::Relay)?;

    let mut relayed: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(ForwardError::Stream)?;
        client.write_all(&chunk).await.map_err(ForwardError::Relay)?;
        // Flush per chunk so server-sent events reach the client promptly.
        client.flush().await.map_err(ForwardError::Relay)?;
        relayed += chunk.len() as u64;
    }

    let _ = client.shutdown().await;
    debug!(%status, bytes = relayed, "External response relayed");
    Ok(relayed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::Headers;
    use bytes::Bytes;

    #[test]
    fn test_should_mirror_header() {
        // Should mirror
        assert!(should_mirror_header("content-type"));
        assert!(should_mirror_header("Content-Length"));
        assert!(should_mirror_header("x-request-id"));

        // Should NOT mirror
        assert!(!should_mirror_header("Connection"));
        assert!(!should_mirror_header("transfer-encoding"));
        assert!(!should_mirror_header("Keep-Alive"));
        assert!(!should_mirror_header("upgrade"));
    }

    #[test]
    fn test_provider_url() {
        assert_eq!(
            provider_url("https://api.x.ai/v1", "/v1/chat/completions"),
            "https://api.x.ai/v1/chat/completions"
        );
        assert_eq!(
            provider_url("https://api.z.ai/api/paas/v4/", "/v1/chat/completions?beta=1"),
            "https://api.z.ai/api/paas/v4/chat/completions?beta=1"
        );
        // Only a whole `/v1` segment is stripped.
        assert_eq!(
            provider_url("https://openrouter.ai/api/v1", "/v1beta/models"),
            "https://openrouter.ai/api/v1/v1beta/models"
        );
        assert_eq!(
            provider_url("https://api.moonshot.ai/v1", "/chat/completions"),
            "https://api.moonshot.ai/v1/chat/completions"
        );
    }

    #[test]
    fn test_managed_request_head_rewrites_host_and_connection() {
        let mut headers = Headers::new();
        headers.insert("Host", "localhost:8317");
        headers.insert("Content-Type", "application/json");
        headers.insert("Connection", "keep-alive");
        headers.insert("Content-Length", "2");
        headers.insert("X-Custom", "a:b");
        let request = InboundRequest {
            method: "POST".to_string(),
            target: "/v1/chat/completions?stream=1".to_string(),
            headers,
            body: Bytes::from_static(b"{}"),
        };

        let head = managed_request_head(&request, "127.0.0.1:8318");

        assert_eq!(
            head,
            "POST /v1/chat/completions?stream=1 HTTP/1.1\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 2\r\n\
             X-Custom: a:b\r\n\
             Host: 127.0.0.1:8318\r\n\
             Connection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_error_status_mapping() {
        let refused = ForwardError::Connect(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(refused.response_status(), Some(502));
        assert_eq!(refused.to_error_response().error.r#type, "upstream_error");

        let bad_method = ForwardError::InvalidMethod("B@D".to_string());
        assert_eq!(bad_method.response_status(), Some(400));
        assert_eq!(
            bad_method.to_error_response().error.r#type,
            "invalid_request_error"
        );

        assert_eq!(ForwardError::ClientGone.response_status(), None);
        assert_eq!(
            ForwardError::Relay(io::Error::from(io::ErrorKind::BrokenPipe)).response_status(),
            None
        );
    }

    #[tokio::test]
    async fn test_client_gone_ignores_half_close() {
        let mut reader: &[u8] = b"trailing bytes";
        let watched = tokio::time::timeout(Duration::from_millis(100), client_gone(&mut reader));
        assert!(watched.await.is_err(), "EOF must not count as a disconnect");
    }

    #[tokio::test]
    async fn test_client_gone_resolves_on_read_error() {
        let mut reader = tokio_test::io::Builder::new()
            .read(b"extra")
            .read_error(io::Error::from(io::ErrorKind::ConnectionReset))
            .build();
        tokio::time::timeout(Duration::from_secs(1), client_gone(&mut reader))
            .await
            .unwrap();
    }
}
