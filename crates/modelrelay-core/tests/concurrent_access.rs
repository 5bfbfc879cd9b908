//! Concurrent readers against directory and registry writers.

use std::sync::Arc;
use std::thread;

use modelrelay_core::{ModelRegistry, ProviderDirectory, ProviderId, ProviderUpdate};

#[test]
fn test_readers_never_observe_torn_records() {
    let directory = Arc::new(ProviderDirectory::new());
    let registry = Arc::new(ModelRegistry::new(Arc::clone(&directory)));
    registry.register("grok-4", ProviderId::Grok);

    let writer = {
        let directory = Arc::clone(&directory);
        thread::spawn(move || {
            for i in 0..500 {
                let (key, url) = if i % 2 == 0 {
                    ("even", "https://even.example/v1")
                } else {
                    ("odd", "https://odd.example/v1")
                };
                directory.apply(
                    ProviderId::Grok,
                    &ProviderUpdate {
                        enabled: Some(true),
                        api_key: Some(key.to_string()),
                        custom_base_url: Some(Some(url.to_string())),
                    },
                );
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..500 {
                    if let Some(route) = registry.route_for("grok-4") {
                        // Key and URL are always written together.
                        let expected = format!("https://{}.example/v1", route.api_key);
                        assert_eq!(route.base_url, expected);
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert!(registry.provider_for("grok-4").is_some());
}

#[test]
fn test_register_is_visible_to_other_threads() {
    let directory = Arc::new(ProviderDirectory::new());
    directory.set_enabled(ProviderId::OpenRouter, true);
    let registry = Arc::new(ModelRegistry::new(directory));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.register(format!("model-{n}"), ProviderId::OpenRouter))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 8);
    assert_eq!(
        registry.provider_for("model-3"),
        Some(ProviderId::OpenRouter)
    );
}
