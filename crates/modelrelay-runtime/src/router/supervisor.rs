//! Router supervisor for managing the model router lifecycle.
//!
//! The RouterSupervisor owns the router state internally, using
//! tokio::sync::Mutex for async-safe access. Callers start, stop and query
//! the router without storing handles themselves.
//!
//! - **Bind-then-report**: the listener binds FIRST, then reports the real address
//! - **Crash detection**: status() uses the cancellation token to tell a clean stop from a crash

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result as AnyResult;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use modelrelay_core::{DEFAULT_HOST, DEFAULT_ROUTER_PORT, RouterSettings};
use modelrelay_proxy::RouterState;

/// How long `stop()` waits for in-flight work before aborting.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a running router.
struct RouterHandle {
    cancel_token: CancellationToken,
    join_handle: JoinHandle<AnyResult<()>>,
    bound_addr: SocketAddr,
}

/// Status of the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterStatus {
    /// Router is not running.
    Stopped,
    /// Router is running and listening.
    Running {
        /// Address the router is listening on.
        address: SocketAddr,
    },
    /// Router task finished without being asked to stop.
    Crashed,
}

impl fmt::Display for RouterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Running { address } => write!(f, "Running on {address}"),
            Self::Crashed => write!(f, "Crashed"),
        }
    }
}

/// Error from supervisor operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Router is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("Failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    #[error("Router is not running")]
    NotRunning,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Where the router listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Host to bind to (e.g., "127.0.0.1").
    pub host: String,
    /// Port to bind to (0 for auto-assign).
    pub port: u16,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_ROUTER_PORT,
        }
    }
}

impl From<&RouterSettings> for RouterConfig {
    fn from(settings: &RouterSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
        }
    }
}

/// Supervisor for the model router.
///
/// # Example
///
/// ```ignore
/// let supervisor = RouterSupervisor::new();
/// let addr = supervisor.start(config, state).await?;
/// println!("Status: {}", supervisor.status().await);
/// supervisor.stop().await?;
/// ```
pub struct RouterSupervisor {
    handle: Mutex<Option<RouterHandle>>,
}

impl Default for RouterSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterSupervisor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Start the router.
    ///
    /// Binds FIRST, then spawns the listener task with `state`.
    ///
    /// # Errors
    ///
    /// Returns error if already running or if bind fails.
    pub async fn start(
        &self,
        config: RouterConfig,
        state: Arc<RouterState>,
    ) -> Result<SocketAddr, SupervisorError> {
        let mut guard = self.handle.lock().await;

        if let Some(old) = guard.take() {
            if !old.join_handle.is_finished() {
                let addr = old.bound_addr;
                *guard = Some(old);
                return Err(SupervisorError::AlreadyRunning(addr));
            }
            match old.join_handle.await {
                Ok(Ok(())) => debug!("Previous router task completed normally"),
                Ok(Err(e)) => warn!("Previous router task ended with error: {e}"),
                Err(e) => warn!("Previous router task panicked: {e}"),
            }
        }

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener =
            TcpListener::bind(&bind_addr)
                .await
                .map_err(|e| SupervisorError::BindFailed {
                    address: bind_addr.clone(),
                    reason: e.to_string(),
                })?;

        let bound_addr = listener
            .local_addr()
            .map_err(|e| SupervisorError::Internal(format!("Failed to get local address: {e}")))?;

        info!("Router bound to {bound_addr}");

        let cancel_token = CancellationToken::new();
        let cancel_clone = cancel_token.clone();

        let join_handle: JoinHandle<AnyResult<()>> = tokio::spawn(async move {
            debug!(addr = %bound_addr, "Router task starting");
            let result = modelrelay_proxy::serve(listener, state, cancel_clone).await;
            if let Err(e) = &result {
                error!("Router listener failed: {e}");
            }
            result
        });

        *guard = Some(RouterHandle {
            cancel_token,
            join_handle,
            bound_addr,
        });

        Ok(bound_addr)
    }

    /// Stop the router.
    ///
    /// Cancels the listener and every in-flight connection, then waits up to
    /// five seconds before aborting the task.
    ///
    /// # Errors
    ///
    /// Returns error if not running or if the task panicked/errored.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let mut guard = self.handle.lock().await;

        let Some(handle) = guard.take() else {
            return Err(SupervisorError::NotRunning);
        };

        info!("Stopping router on {}", handle.bound_addr);
        handle.cancel_token.cancel();

        let mut join = handle.join_handle;
        match tokio::time::timeout(STOP_TIMEOUT, &mut join).await {
            Ok(Ok(Ok(()))) => {
                info!("Router stopped cleanly");
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                error!("Router task ended with error: {e}");
                Err(SupervisorError::Internal(format!("Router error: {e}")))
            }
            Ok(Err(join_err)) => {
                error!("Router task panicked: {join_err}");
                Err(SupervisorError::Internal(format!(
                    "Task panicked: {join_err}"
                )))
            }
            Err(_) => {
                warn!("Router stop timed out; aborting task");
                join.abort();
                Err(SupervisorError::Internal(
                    "Router stop timed out; task aborted".into(),
                ))
            }
        }
    }

    /// Current status of the router.
    ///
    /// A finished task counts as `Stopped` when it was cancelled and as
    /// `Crashed` otherwise; either way the handle is cleared.
    pub async fn status(&self) -> RouterStatus {
        let mut guard = self.handle.lock().await;

        let Some(handle) = guard.as_ref() else {
            return RouterStatus::Stopped;
        };

        if handle.join_handle.is_finished() {
            let was_cancelled = handle.cancel_token.is_cancelled();
            *guard = None;

            if was_cancelled {
                RouterStatus::Stopped
            } else {
                warn!("Detected crashed router, cleaning up handle");
                RouterStatus::Crashed
            }
        } else {
            RouterStatus::Running {
                address: handle.bound_addr,
            }
        }
    }

    /// Bound address if running.
    pub async fn bound_address(&self) -> Option<SocketAddr> {
        let guard = self.handle.lock().await;
        guard.as_ref().and_then(|h| {
            if h.join_handle.is_finished() {
                None
            } else {
                Some(h.bound_addr)
            }
        })
    }
}

impl fmt::Debug for RouterSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterSupervisor").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelrelay_core::{ModelRegistry, ProviderDirectory};
    use tokio_test::{assert_err, assert_ok};

    fn make_state() -> Arc<RouterState> {
        let registry = Arc::new(ModelRegistry::new(Arc::new(ProviderDirectory::new())));
        Arc::new(RouterState::new(RouterSettings::default(), registry).unwrap())
    }

    fn test_config() -> RouterConfig {
        RouterConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }

    #[tokio::test]
    async fn test_supervisor_lifecycle() {
        let supervisor = RouterSupervisor::new();

        assert_eq!(supervisor.status().await, RouterStatus::Stopped);
        assert_eq!(supervisor.bound_address().await, None);

        let addr = assert_ok!(supervisor.start(test_config(), make_state()).await);
        assert_ne!(addr.port(), 0);

        match supervisor.status().await {
            RouterStatus::Running { address } => assert_eq!(address, addr),
            other => panic!("Expected Running, got {other:?}"),
        }
        assert_eq!(supervisor.bound_address().await, Some(addr));

        // Can't start again
        assert!(matches!(
            supervisor.start(test_config(), make_state()).await,
            Err(SupervisorError::AlreadyRunning(_))
        ));

        assert_ok!(supervisor.stop().await);
        assert_eq!(supervisor.status().await, RouterStatus::Stopped);

        // Can't stop again
        assert!(matches!(
            supervisor.stop().await,
            Err(SupervisorError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let supervisor = RouterSupervisor::new();

        let addr1 = supervisor.start(test_config(), make_state()).await.unwrap();
        supervisor.stop().await.unwrap();

        let addr2 = supervisor.start(test_config(), make_state()).await.unwrap();
        assert_ne!(addr1.port(), 0);
        assert_ne!(addr2.port(), 0);

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let supervisor = RouterSupervisor::new();
        let err = assert_err!(
            supervisor
                .start(
                    RouterConfig {
                        host: "127.0.0.1".to_string(),
                        port,
                    },
                    make_state(),
                )
                .await
        );

        assert!(matches!(err, SupervisorError::BindFailed { .. }));
        assert_eq!(supervisor.status().await, RouterStatus::Stopped);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = RouterSettings {
            host: "0.0.0.0".to_string(),
            port: 9000,
            ..RouterSettings::default()
        };
        assert_eq!(
            RouterConfig::from(&settings),
            RouterConfig {
                host: "0.0.0.0".to_string(),
                port: 9000,
            }
        );
        assert_eq!(RouterStatus::Crashed.to_string(), "Crashed");
    }
}
