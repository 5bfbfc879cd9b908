//! External provider directory.
//!
//! Holds one record per known external provider. The static half of each
//! provider (identifier, default API root) is fixed at compile time; the
//! mutable half (enabled flag, API key, base URL override) is written by the
//! configuration surface and read by the router on every request.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Identifier of an external provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenRouter,
    MiniMax,
    Moonshot,
    Grok,
    Zai,
}

impl ProviderId {
    /// Every known provider, in display order.
    pub const ALL: [Self; 5] = [
        Self::OpenRouter,
        Self::MiniMax,
        Self::Moonshot,
        Self::Grok,
        Self::Zai,
    ];

    /// Stable string identifier (e.g. `"grok"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::MiniMax => "minimax",
            Self::Moonshot => "moonshot",
            Self::Grok => "grok",
            Self::Zai => "zai",
        }
    }

    /// Immutable fallback API root for this provider.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::MiniMax => "https://api.minimax.io/v1",
            Self::Moonshot => "https://api.moonshot.ai/v1",
            Self::Grok => "https://api.x.ai/v1",
            Self::Zai => "https://api.z.ai/api/paas/v4",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provider identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// Mutable state of a single provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    pub id: ProviderId,
    pub enabled: bool,
    /// Opaque bearer credential. Empty when unset.
    pub api_key: String,
    /// Optional override of the default base URL.
    pub custom_base_url: Option<String>,
}

impl ProviderRecord {
    /// A fresh, disabled record with no key and no override.
    #[must_use]
    pub const fn new(id: ProviderId) -> Self {
        Self {
            id,
            enabled: false,
            api_key: String::new(),
            custom_base_url: None,
        }
    }

    /// The override when present and non-empty, otherwise the default root.
    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        match self.custom_base_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => self.id.default_base_url(),
        }
    }

    /// Whether an API key has been supplied.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn merge(&mut self, update: &ProviderUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(ref key) = update.api_key {
            self.api_key.clone_from(key);
        }
        if let Some(ref url) = update.custom_base_url {
            self.custom_base_url.clone_from(url);
        }
    }
}

// Hand-written so the API key never ends up in logs.
impl fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("id", &self.id)
            .field("enabled", &self.enabled)
            .field("api_key", &if self.has_api_key() { "<set>" } else { "<empty>" })
            .field("custom_base_url", &self.custom_base_url)
            .finish()
    }
}

/// Partial provider update.
///
/// - `None` = don't change this field
/// - `custom_base_url: Some(None)` = clear the override
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderUpdate {
    pub enabled: Option<bool>,
    pub api_key: Option<String>,
    pub custom_base_url: Option<Option<String>>,
}

/// Everything the external forwarder needs to reach one provider.
///
/// Taken as a snapshot at routing time so a concurrent settings change cannot
/// tear an in-flight request.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderRoute {
    pub id: ProviderId,
    pub base_url: String,
    pub api_key: String,
}

impl fmt::Debug for ProviderRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRoute")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl From<&ProviderRecord> for ProviderRoute {
    fn from(record: &ProviderRecord) -> Self {
        Self {
            id: record.id,
            base_url: record.effective_base_url().to_string(),
            api_key: record.api_key.clone(),
        }
    }
}

/// Shared, read-mostly directory of external providers.
///
/// Readers always see the latest applied update; there is no caching layer.
#[derive(Debug)]
pub struct ProviderDirectory {
    records: RwLock<HashMap<ProviderId, ProviderRecord>>,
}

impl Default for ProviderDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderDirectory {
    /// Create a directory with one disabled record per known provider.
    #[must_use]
    pub fn new() -> Self {
        let records = ProviderId::ALL
            .into_iter()
            .map(|id| (id, ProviderRecord::new(id)))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Current state of one provider.
    pub fn snapshot(&self, id: ProviderId) -> ProviderRecord {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records
            .get(&id)
            .cloned()
            .unwrap_or_else(|| ProviderRecord::new(id))
    }

    /// Current state of every provider, in `ProviderId::ALL` order.
    pub fn snapshot_all(&self) -> Vec<ProviderRecord> {
        ProviderId::ALL
            .into_iter()
            .map(|id| self.snapshot(id))
            .collect()
    }

    /// Records of every provider whose `enabled` flag is set.
    pub fn enabled_providers(&self) -> Vec<ProviderRecord> {
        self.snapshot_all()
            .into_iter()
            .filter(|record| record.enabled)
            .collect()
    }

    pub fn is_enabled(&self, id: ProviderId) -> bool {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(&id).is_some_and(|record| record.enabled)
    }

    /// Route snapshot for `id`, or `None` when the provider is disabled.
    pub fn route_for(&self, id: ProviderId) -> Option<ProviderRoute> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records
            .get(&id)
            .filter(|record| record.enabled)
            .map(ProviderRoute::from)
    }

    /// Apply a partial update and return the resulting record.
    pub fn apply(&self, id: ProviderId, update: &ProviderUpdate) -> ProviderRecord {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(id).or_insert_with(|| ProviderRecord::new(id));
        record.merge(update);
        record.clone()
    }

    pub fn set_enabled(&self, id: ProviderId, enabled: bool) {
        self.apply(
            id,
            &ProviderUpdate {
                enabled: Some(enabled),
                ..ProviderUpdate::default()
            },
        );
    }

    pub fn set_api_key(&self, id: ProviderId, api_key: impl Into<String>) {
        self.apply(
            id,
            &ProviderUpdate {
                api_key: Some(api_key.into()),
                ..ProviderUpdate::default()
            },
        );
    }

    pub fn set_custom_base_url(&self, id: ProviderId, url: Option<String>) {
        self.apply(
            id,
            &ProviderUpdate {
                custom_base_url: Some(url),
                ..ProviderUpdate::default()
            },
        );
    }
}
