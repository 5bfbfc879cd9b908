//! Serve command handler.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::commands::ServeArgs;
use crate::config::{directory_from_env, settings_from_args};
use crate::error::CliError;

/// Execute the serve command.
///
/// Runs the router with providers from the environment until Ctrl-C.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let settings = settings_from_args(&args)?;
    let directory = Arc::new(directory_from_env()?);

    let enabled: Vec<String> = directory
        .enabled_providers()
        .iter()
        .map(|record| record.id.to_string())
        .collect();
    if enabled.is_empty() {
        info!("No external providers enabled; all requests go to the managed backend");
    } else {
        info!(providers = %enabled.join(", "), "External providers enabled");
    }

    modelrelay_runtime::run_router(settings, directory, !args.no_refresh)
        .await
        .map_err(|e| CliError::Runtime(format!("{e:#}")))?;

    Ok(())
}
