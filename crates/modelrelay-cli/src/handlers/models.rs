//! Models command handler.
//!
//! Refreshes the registry from every enabled provider and prints the result.

use std::sync::Arc;

use anyhow::Result;

use modelrelay_core::{ModelRegistry, RegistryEntry};
use modelrelay_runtime::{HttpModelListClient, ModelRefresher};

use crate::config::directory_from_env;
use crate::error::CliError;
use crate::presentation::{print_separator, truncate_string};

/// Execute the models command.
pub async fn execute(json: bool) -> Result<()> {
    let directory = Arc::new(directory_from_env()?);
    if directory.enabled_providers().is_empty() {
        eprintln!("No external providers enabled.");
        eprintln!("Set e.g. GROK_API_KEY to enable one.");
        return Ok(());
    }

    let registry = Arc::new(ModelRegistry::new(directory));
    let port = Arc::new(HttpModelListClient::new().map_err(|e| CliError::Runtime(e.to_string()))?);
    let report = ModelRefresher::new(Arc::clone(&registry), port)
        .trigger()
        .wait()
        .await;

    for (provider, reason) in &report.failed {
        eprintln!("warning: {provider}: {reason}");
    }

    let entries = registry.list_all();
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_table(&entries);
    }

    Ok(())
}

fn print_table(entries: &[RegistryEntry]) {
    if entries.is_empty() {
        println!("No models found.");
        return;
    }

    println!("Found {} model(s):\n", entries.len());
    println!("{:<48} Provider", "Model");
    print_separator(60);
    for entry in entries {
        println!("{:<48} {}", truncate_string(&entry.model_id, 47), entry.provider);
    }
}
