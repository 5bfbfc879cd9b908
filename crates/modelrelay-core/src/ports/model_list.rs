//! Model-list port for querying an external provider's catalog.
//!
//! The registry uses this port during refresh. It abstracts the HTTP
//! details so the refresh logic can be exercised without network access.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while fetching a provider's model list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelListError {
    /// The request never produced an HTTP response (DNS, TLS, timeout...).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-2xx status.
    #[error("Provider returned status {0}")]
    Status(u16),

    /// The body was not shaped like `{"data":[{"id": ...}]}`.
    #[error("Malformed model list: {0}")]
    Malformed(String),
}

/// Port for fetching the model identifiers an external provider serves.
#[async_trait]
pub trait ModelListPort: Send + Sync + fmt::Debug {
    /// Fetch `GET {base_url}/models` using `api_key` as bearer credential.
    ///
    /// Returns the `id` of every entry in the response's `data` array.
    ///
    /// # Errors
    ///
    /// Returns `ModelListError` on transport failure, non-2xx status, or a
    /// body that does not match the expected shape.
    async fn list_models(&self, base_url: &str, api_key: &str)
    -> Result<Vec<String>, ModelListError>;
}
