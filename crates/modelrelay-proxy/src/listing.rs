//! Aggregated `/v1/models` listing.
//!
//! Combines whatever the managed backend reports with every model id in the
//! registry. The managed half is best effort: any failure there yields an
//! empty list, and the external half is still returned.

use std::io;

use reqwest::Client;
use tokio::io::AsyncWrite;
use tracing::{debug, warn};

use modelrelay_core::ModelRegistry;

use crate::models::{ModelsResponse, UpstreamModelList};
use crate::response::write_json_response;

/// Fetch the managed backend's own model entries.
///
/// Returns an empty list on any failure (unreachable, non-2xx, bad JSON).
pub async fn fetch_managed_models(http: &Client, managed_base_url: &str) -> Vec<serde_json::Value> {
    let url = format!("{}/v1/models", managed_base_url.trim_end_matches('/'));

    let response = match http.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(%url, error = %e, "Managed backend unreachable for model listing");
            return Vec::new();
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(%url, %status, "Managed backend returned an error for model listing");
        return Vec::new();
    }

    match response.json::<UpstreamModelList>().await {
        Ok(list) => {
            debug!(count = list.data.len(), "Fetched managed models");
            list.data
        }
        Err(e) => {
            warn!(%url, error = %e, "Managed backend returned a malformed model list");
            Vec::new()
        }
    }
}

/// Build the merged listing: managed entries first, then registry entries.
pub async fn aggregate_models(
    http: &Client,
    managed_base_url: &str,
    registry: &ModelRegistry,
) -> ModelsResponse {
    let managed = fetch_managed_models(http, managed_base_url).await;
    ModelsResponse::merged(managed, registry.list_all())
}

/// Answer a `/v1/models` request with `200 OK` and the merged listing.
pub async fn serve_models<W>(
    client: &mut W,
    http: &Client,
    managed_base_url: &str,
    registry: &ModelRegistry,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let listing = aggregate_models(http, managed_base_url, registry).await;
    debug!(count = listing.data.len(), "Serving aggregated model list");
    write_json_response(client, 200, &listing).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelrelay_core::{ProviderDirectory, ProviderId};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry() -> ModelRegistry {
        let registry = ModelRegistry::new(Arc::new(ProviderDirectory::new()));
        registry.register("grok-4", ProviderId::Grok);
        registry.register("kimi-k2", ProviderId::Moonshot);
        registry
    }

    #[tokio::test]
    async fn test_aggregate_concatenates_managed_and_registry() {
        let managed = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    {"id": "claude-sonnet-4-5", "object": "model", "owned_by": "anthropic"},
                    {"id": "gpt-5-codex", "object": "model", "owned_by": "openai"}
                ]
            })))
            .mount(&managed)
            .await;

        let listing = aggregate_models(&Client::new(), &managed.uri(), &registry()).await;
        let json = serde_json::to_value(&listing).unwrap();

        assert_eq!(json["object"], "list");
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data[0]["id"], "claude-sonnet-4-5");
        assert_eq!(data[0]["owned_by"], "anthropic");
        assert_eq!(data[2]["id"], "grok-4");
        assert_eq!(data[3]["owned_by"], "moonshot");
    }

    #[tokio::test]
    async fn test_managed_error_status_yields_registry_only() {
        let managed = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&managed)
            .await;

        let listing = aggregate_models(&Client::new(), &managed.uri(), &registry()).await;
        assert_eq!(listing.data.len(), 2);
    }

    #[tokio::test]
    async fn test_managed_malformed_body_yields_registry_only() {
        let managed = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&managed)
            .await;

        let listing = aggregate_models(&Client::new(), &managed.uri(), &registry()).await;
        assert_eq!(listing.data.len(), 2);
    }

    #[tokio::test]
    async fn test_managed_unreachable_yields_registry_only() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let models = fetch_managed_models(&Client::new(), &format!("http://{addr}")).await;
        assert!(models.is_empty());
    }

    #[tokio::test]
    async fn test_serve_models_writes_ok_response() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut out: Vec<u8> = Vec::new();
        serve_models(&mut out, &Client::new(), &format!("http://{addr}"), &registry())
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK"));
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }
}
