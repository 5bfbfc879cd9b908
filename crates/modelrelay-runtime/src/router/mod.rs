//! Model router runtime.
//!
//! The listener itself lives in `modelrelay-proxy`; this module owns its
//! lifecycle through [`RouterSupervisor`] and wires a standalone instance
//! together for the CLI.

pub mod supervisor;

pub use supervisor::{RouterConfig, RouterStatus, RouterSupervisor, SupervisorError};

use std::sync::Arc;

use anyhow::Result;

use modelrelay_core::{ModelRegistry, ProviderDirectory, RouterSettings, validate_settings};
use modelrelay_proxy::RouterState;

use crate::model_list::HttpModelListClient;
use crate::refresh::ModelRefresher;

/// Run the router as a standalone server until Ctrl-C.
///
/// Validates `settings`, optionally starts a background model refresh for
/// every enabled provider, then serves. Requests arriving before the refresh
/// completes are routed against whatever the registry holds so far.
pub async fn run_router(
    settings: RouterSettings,
    directory: Arc<ProviderDirectory>,
    refresh: bool,
) -> Result<()> {
    validate_settings(&settings)?;

    let registry = Arc::new(ModelRegistry::new(directory));

    let refresh_handle = if refresh {
        let port = Arc::new(HttpModelListClient::new()?);
        Some(ModelRefresher::new(Arc::clone(&registry), port).trigger())
    } else {
        tracing::info!("Model refresh disabled; only the managed backend is reachable");
        None
    };

    let config = RouterConfig::from(&settings);
    let state = Arc::new(RouterState::new(settings, registry)?);

    let supervisor = RouterSupervisor::new();
    let addr = supervisor.start(config, state).await?;
    tracing::info!("Router started on {addr}");

    tokio::signal::ctrl_c().await?;

    if let Some(handle) = refresh_handle
        && !handle.is_finished()
    {
        handle.abort();
    }

    supervisor.stop().await?;

    Ok(())
}
