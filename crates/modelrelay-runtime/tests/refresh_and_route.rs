//! Refresh the registry from mock providers, then route through a supervised
//! router.

use std::sync::Arc;

use modelrelay_core::{ModelRegistry, ProviderDirectory, ProviderId, RouterSettings};
use modelrelay_proxy::RouterState;
use modelrelay_runtime::{
    HttpModelListClient, ModelRefresher, RouterConfig, RouterStatus, RouterSupervisor,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn provider_with_models(key: &str, ids: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    let data: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| serde_json::json!({"id": id, "object": "model"}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", format!("Bearer {key}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": data
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_refreshed_models_are_routed_to_their_provider() {
    let grok = provider_with_models("xai-key", &["grok-4", "grok-code-fast-1"]).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer xai-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("from grok"))
        .mount(&grok)
        .await;

    // Moonshot is enabled but broken; its failure must not affect Grok.
    let moonshot = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&moonshot)
        .await;

    let directory = Arc::new(ProviderDirectory::new());
    directory.set_api_key(ProviderId::Grok, "xai-key");
    directory.set_custom_base_url(ProviderId::Grok, Some(format!("{}/v1", grok.uri())));
    directory.set_enabled(ProviderId::Grok, true);
    directory.set_api_key(ProviderId::Moonshot, "moon-key");
    directory.set_custom_base_url(ProviderId::Moonshot, Some(format!("{}/v1", moonshot.uri())));
    directory.set_enabled(ProviderId::Moonshot, true);

    let registry = Arc::new(ModelRegistry::new(directory));
    let refresher = ModelRefresher::new(
        Arc::clone(&registry),
        Arc::new(HttpModelListClient::new().unwrap()),
    );
    let report = refresher.trigger().wait().await;

    assert_eq!(report.refreshed, vec![(ProviderId::Grok, 2)]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ProviderId::Moonshot);
    assert_eq!(registry.len(), 2);

    let state = Arc::new(RouterState::new(RouterSettings::default(), registry).unwrap());
    let supervisor = RouterSupervisor::new();
    let addr = supervisor
        .start(
            RouterConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            state,
        )
        .await
        .unwrap();
    assert_eq!(
        supervisor.status().await,
        RouterStatus::Running { address: addr }
    );

    let body = r#"{"model":"grok-code-fast-1"}"#;
    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(
            format!(
                "POST /v1/chat/completions HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
                body.len()
            )
            .as_bytes(),
        )
        .await
        .unwrap();
    let mut response = String::new();
    client.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("from grok"));

    supervisor.stop().await.unwrap();
    assert_eq!(supervisor.status().await, RouterStatus::Stopped);
}

#[tokio::test]
async fn test_refresh_skips_disabled_providers() {
    let grok = provider_with_models("xai-key", &["grok-4"]).await;

    let directory = Arc::new(ProviderDirectory::new());
    directory.set_api_key(ProviderId::Grok, "xai-key");
    directory.set_custom_base_url(ProviderId::Grok, Some(format!("{}/v1", grok.uri())));
    directory.set_enabled(ProviderId::Grok, false);

    let registry = Arc::new(ModelRegistry::new(directory));
    let report = ModelRefresher::new(
        Arc::clone(&registry),
        Arc::new(HttpModelListClient::new().unwrap()),
    )
    .trigger()
    .wait()
    .await;

    assert!(report.refreshed.is_empty());
    assert!(report.is_clean());
    assert!(registry.is_empty());
}
