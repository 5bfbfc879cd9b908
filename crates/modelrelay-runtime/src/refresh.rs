//! Tracked background refresh of the model registry.
//!
//! A refresh is an explicit task with a handle: callers can fire and forget,
//! poll it, or await its [`RefreshReport`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use modelrelay_core::{ModelListPort, ModelRegistry, RefreshReport};

/// Spawns registry refreshes against a model-list port.
#[derive(Debug, Clone)]
pub struct ModelRefresher {
    registry: Arc<ModelRegistry>,
    port: Arc<dyn ModelListPort>,
}

impl ModelRefresher {
    pub fn new(registry: Arc<ModelRegistry>, port: Arc<dyn ModelListPort>) -> Self {
        Self { registry, port }
    }

    /// Start a refresh of every enabled provider in the background.
    pub fn trigger(&self) -> RefreshHandle {
        let registry = Arc::clone(&self.registry);
        let port = Arc::clone(&self.port);
        debug!("Triggering model registry refresh");
        let join = tokio::spawn(async move { registry.refresh(port.as_ref()).await });
        RefreshHandle { join }
    }
}

/// Handle to one in-flight refresh.
#[derive(Debug)]
pub struct RefreshHandle {
    join: JoinHandle<RefreshReport>,
}

impl RefreshHandle {
    /// Wait for the refresh to finish.
    ///
    /// A refresh task that panicked or was aborted yields an empty report;
    /// whatever it committed before that stays in the registry.
    pub async fn wait(self) -> RefreshReport {
        match self.join.await {
            Ok(report) => report,
            Err(e) => {
                error!("Model refresh task failed: {e}");
                RefreshReport::default()
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the refresh. Providers already committed keep their entries.
    pub fn abort(&self) {
        self.join.abort();
    }
}
