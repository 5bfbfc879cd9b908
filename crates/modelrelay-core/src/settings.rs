//! Router settings and validation.
//!
//! Pure domain types with no infrastructure dependencies. Adapters fill these
//! in from flags, environment variables or a settings surface.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default port the router listens on.
pub const DEFAULT_ROUTER_PORT: u16 = 8317;

/// Default port of the managed backend.
pub const DEFAULT_MANAGED_PORT: u16 = 8318;

/// Default host for both the listener and the managed backend.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bound on connecting to the managed backend.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on a whole external-provider request, body included.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(600);

/// Default limit on the request line plus headers.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Default limit on a declared request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Runtime settings of the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Host the listener binds to.
    pub host: String,
    /// Port the listener binds to (0 for auto-assign).
    pub port: u16,
    /// Host of the managed backend.
    pub managed_host: String,
    /// Port of the managed backend.
    pub managed_port: u16,
    /// Bound on connecting to the managed backend and on its model listing.
    pub connect_timeout: Duration,
    /// Bound on an entire external-provider request.
    pub upstream_timeout: Duration,
    /// Maximum size of the request line plus headers.
    pub max_header_bytes: usize,
    /// Maximum declared request body size.
    pub max_body_bytes: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_ROUTER_PORT,
            managed_host: DEFAULT_HOST.to_string(),
            managed_port: DEFAULT_MANAGED_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl RouterSettings {
    /// `host:port` of the managed backend, as written in the `Host` header.
    pub fn managed_authority(&self) -> String {
        format!("{}:{}", self.managed_host, self.managed_port)
    }

    /// Base URL of the managed backend (e.g. `http://127.0.0.1:8318`).
    pub fn managed_base_url(&self) -> String {
        format!("http://{}", self.managed_authority())
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Managed backend port must be non-zero")]
    InvalidManagedPort,

    #[error("Router and managed backend cannot share the address {0}")]
    AddressConflict(String),

    #[error("Host cannot be empty")]
    EmptyHost,

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// Validate router settings.
pub fn validate_settings(settings: &RouterSettings) -> Result<(), SettingsError> {
    if settings.host.trim().is_empty() || settings.managed_host.trim().is_empty() {
        return Err(SettingsError::EmptyHost);
    }
    if settings.managed_port == 0 {
        return Err(SettingsError::InvalidManagedPort);
    }
    if settings.port == settings.managed_port && settings.host == settings.managed_host {
        return Err(SettingsError::AddressConflict(settings.managed_authority()));
    }
    if settings.connect_timeout.is_zero() {
        return Err(SettingsError::ZeroLimit("Connect timeout"));
    }
    if settings.upstream_timeout.is_zero() {
        return Err(SettingsError::ZeroLimit("Upstream timeout"));
    }
    if settings.max_header_bytes == 0 {
        return Err(SettingsError::ZeroLimit("Header limit"));
    }
    if settings.max_body_bytes == 0 {
        return Err(SettingsError::ZeroLimit("Body limit"));
    }
    Ok(())
}
