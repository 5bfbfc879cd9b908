//! OpenAI API data models used by the router.
//!
//! Only the handful of types the router reads or writes itself live here.
//! Completion payloads are relayed opaquely and never deserialized.

use modelrelay_core::RegistryEntry;
use serde::{Deserialize, Serialize};

// =============================================================================
// Model Selection
// =============================================================================

/// The only part of a completion request the router inspects.
///
/// Every other field is ignored and relayed untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSelector {
    #[serde(default)]
    pub model: Option<String>,
}

impl ModelSelector {
    /// Extract a usable `model` value from a raw request body.
    ///
    /// Returns `None` for non-JSON bodies, a missing or non-string `model`
    /// field, or an empty string.
    pub fn model_from_body(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .and_then(|selector| selector.model)
            .filter(|model| !model.is_empty())
    }
}

// =============================================================================
// Model Listing Types
// =============================================================================

/// Response for `GET /v1/models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

impl ModelsResponse {
    /// Concatenate the managed backend's entries with the registry's.
    ///
    /// No de-duplication: an id present in both lists appears twice.
    pub fn merged(managed: Vec<serde_json::Value>, external: Vec<RegistryEntry>) -> Self {
        let data = managed
            .into_iter()
            .map(ModelEntry::Managed)
            .chain(external.into_iter().map(|e| ModelEntry::External(e.into())))
            .collect();
        Self {
            object: "list".to_string(),
            data,
        }
    }
}

/// One element of the `data` array.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModelEntry {
    /// Entry reported by the managed backend, passed through verbatim.
    Managed(serde_json::Value),
    /// Entry synthesized from the model registry.
    External(ModelInfo),
}

/// Information about a single external model (OpenAI format).
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl From<RegistryEntry> for ModelInfo {
    fn from(entry: RegistryEntry) -> Self {
        Self {
            id: entry.model_id,
            object: "model".to_string(),
            created: 0,
            owned_by: entry.provider.to_string(),
        }
    }
}

/// Model list returned by the managed backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamModelList {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

// =============================================================================
// Error Response Types
// =============================================================================

/// Error response matching OpenAI format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
            },
        }
    }

    /// Create an error response for an unreachable or failing upstream.
    pub fn upstream_error(message: &str) -> Self {
        Self::new(format!("Upstream error: {message}"), "upstream_error")
    }

    /// Create an error response for a request the router cannot forward.
    pub fn invalid_request(message: &str) -> Self {
        Self::new(message, "invalid_request_error")
    }
}
