//! Configuration loading for the composition root.
//!
//! Providers come from `{ID}_API_KEY`, `{ID}_BASE_URL` and `{ID}_ENABLED`
//! variables, where `{ID}` is the upper-cased provider id (`GROK_API_KEY`).

use std::time::Duration;

use modelrelay_core::{
    ProviderDirectory, ProviderId, ProviderUpdate, RouterSettings, validate_settings,
};
use tracing::debug;

use crate::commands::ServeArgs;
use crate::error::CliError;

/// Build router settings from `serve` arguments and validate them.
pub fn settings_from_args(args: &ServeArgs) -> Result<RouterSettings, CliError> {
    let settings = RouterSettings {
        host: args.host.clone(),
        port: args.port,
        managed_host: args.managed_host.clone(),
        managed_port: args.managed_port,
        upstream_timeout: Duration::from_secs(args.upstream_timeout_secs),
        ..RouterSettings::default()
    };
    validate_settings(&settings)?;
    Ok(settings)
}

/// Provider directory from the process environment.
pub fn directory_from_env() -> Result<ProviderDirectory, CliError> {
    directory_from_vars(|name| std::env::var(name).ok())
}

/// Provider directory from an arbitrary variable lookup.
///
/// A provider is enabled when `{ID}_ENABLED` is truthy, or when it is unset
/// and a non-empty key is present.
pub fn directory_from_vars<F>(lookup: F) -> Result<ProviderDirectory, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let directory = ProviderDirectory::new();

    for id in ProviderId::ALL {
        let prefix = id.as_str().to_ascii_uppercase();
        let api_key = lookup(&format!("{prefix}_API_KEY"))
            .map(|key| key.trim().to_string())
            .unwrap_or_default();
        let base_url = lookup(&format!("{prefix}_BASE_URL"))
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let enabled_var = format!("{prefix}_ENABLED");
        let enabled = match lookup(&enabled_var) {
            Some(value) => parse_flag(&enabled_var, &value)?,
            None => !api_key.is_empty(),
        };

        let record = directory.apply(
            id,
            &ProviderUpdate {
                enabled: Some(enabled),
                api_key: Some(api_key),
                custom_base_url: Some(base_url),
            },
        );
        debug!(
            provider = %id,
            enabled = record.enabled,
            has_key = record.has_api_key(),
            base_url = record.effective_base_url(),
            "Loaded provider configuration"
        );
    }

    Ok(directory)
}

fn parse_flag(name: &str, value: &str) -> Result<bool, CliError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(CliError::Config(format!(
            "{name} must be a boolean, got {other:?}"
        ))),
    }
}
