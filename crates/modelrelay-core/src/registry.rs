//! Model registry: which external provider serves which model.
//!
//! The registry is filled by [`ModelRegistry::refresh`], never from the
//! request path. Lookups re-check the provider directory on every call, so
//! disabling a provider takes effect immediately without a refresh.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ports::{ModelListError, ModelListPort};
use crate::providers::{ProviderDirectory, ProviderId, ProviderRoute};

/// One model id and the provider bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub model_id: String,
    pub provider: ProviderId,
}

/// Outcome of a registry refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Providers whose list was fetched, with the number of ids registered.
    pub refreshed: Vec<(ProviderId, usize)>,
    /// Providers that were skipped, with the reason.
    pub failed: Vec<(ProviderId, String)>,
}

impl RefreshReport {
    /// Total number of ids registered by this refresh.
    pub fn registered(&self) -> usize {
        self.refreshed.iter().map(|(_, count)| count).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// In-memory mapping from model id to external provider.
#[derive(Debug)]
pub struct ModelRegistry {
    directory: Arc<ProviderDirectory>,
    entries: RwLock<HashMap<String, ProviderId>>,
}

impl ModelRegistry {
    /// Create an empty registry backed by `directory`.
    pub fn new(directory: Arc<ProviderDirectory>) -> Self {
        Self {
            directory,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The provider directory this registry consults on lookup.
    pub fn directory(&self) -> &Arc<ProviderDirectory> {
        &self.directory
    }

    /// Bind `model_id` to `provider`, replacing any previous binding.
    pub fn register(&self, model_id: impl Into<String>, provider: ProviderId) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(model_id.into(), provider);
    }

    fn register_all(&self, provider: ProviderId, model_ids: Vec<String>) -> usize {
        let count = model_ids.len();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for id in model_ids {
            if let Some(previous) = entries.insert(id, provider)
                && previous != provider
            {
                debug!(%provider, %previous, "Model id rebound to a different provider");
            }
        }
        count
    }

    /// Re-fetch the model list of every enabled provider.
    ///
    /// Providers are queried concurrently. Each provider's ids are committed
    /// as soon as its own fetch completes, so a concurrent lookup may observe
    /// a partially refreshed registry. A provider that fails is skipped and
    /// leaves every existing entry untouched.
    pub async fn refresh(&self, port: &dyn ModelListPort) -> RefreshReport {
        let enabled = self.directory.enabled_providers();
        if enabled.is_empty() {
            debug!("No enabled providers; nothing to refresh");
            return RefreshReport::default();
        }

        let fetches = enabled.into_iter().map(|record| async move {
            let result = port
                .list_models(record.effective_base_url(), &record.api_key)
                .await;
            let outcome: Result<usize, ModelListError> =
                result.map(|ids| self.register_all(record.id, ids));
            (record.id, outcome)
        });

        let mut report = RefreshReport::default();
        for (provider, outcome) in join_all(fetches).await {
            match outcome {
                Ok(count) => {
                    debug!(%provider, count, "Registered provider models");
                    report.refreshed.push((provider, count));
                }
                Err(e) => {
                    warn!(%provider, error = %e, "Skipping provider during model refresh");
                    report.failed.push((provider, e.to_string()));
                }
            }
        }

        info!(
            registered = report.registered(),
            failed = report.failed.len(),
            total = self.len(),
            "Model registry refreshed"
        );
        report
    }

    /// Provider serving `model_id`, if bound and currently enabled.
    pub fn provider_for(&self, model_id: &str) -> Option<ProviderId> {
        let provider = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.get(model_id).copied()
        }?;
        self.directory.is_enabled(provider).then_some(provider)
    }

    /// Route snapshot for `model_id`, if bound to a currently enabled provider.
    pub fn route_for(&self, model_id: &str) -> Option<ProviderRoute> {
        let provider = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.get(model_id).copied()
        }?;
        self.directory.route_for(provider)
    }

    /// Every known entry, sorted by model id.
    ///
    /// Entries of disabled providers are included.
    pub fn list_all(&self) -> Vec<RegistryEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<RegistryEntry> = entries
            .iter()
            .map(|(model_id, provider)| RegistryEntry {
                model_id: model_id.clone(),
                provider: *provider,
            })
            .collect();
        drop(entries);
        all.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        all
    }

    /// Every known model id, sorted.
    pub fn model_ids(&self) -> Vec<String> {
        self.list_all().into_iter().map(|e| e.model_id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
