//! Reqwest-backed implementation of [`ModelListPort`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;

use modelrelay_core::{ModelListError, ModelListPort};

/// Default bound on one provider's model-list request.
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    id: String,
}

/// Fetches `GET {base_url}/models` from external providers.
#[derive(Debug, Clone)]
pub struct HttpModelListClient {
    client: reqwest::Client,
}

impl HttpModelListClient {
    /// Create a client with [`DEFAULT_LIST_TIMEOUT`].
    pub fn new() -> reqwest::Result<Self> {
        Self::with_timeout(DEFAULT_LIST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ModelListPort for HttpModelListClient {
    async fn list_models(
        &self,
        base_url: &str,
        api_key: &str,
    ) -> Result<Vec<String>, ModelListError> {
        let url = format!("{}/models", base_url.trim_end_matches('/'));
        debug!(%url, "Fetching provider model list");

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .send()
            .await
            .map_err(|e| ModelListError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelListError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ModelListError::Network(e.without_url().to_string()))?;
        let list: ListResponse =
            serde_json::from_slice(&body).map_err(|e| ModelListError::Malformed(e.to_string()))?;

        Ok(list.data.into_iter().map(|entry| entry.id).collect())
    }
}
