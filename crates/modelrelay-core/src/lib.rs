//! Core domain types and ports for modelrelay.
//!
//! - [`providers`]: the external provider directory
//! - [`registry`]: model id → provider bindings and their refresh
//! - [`settings`]: router settings and validation
//! - [`ports`]: trait seams implemented by infrastructure crates
#![deny(unused_crate_dependencies)]

pub mod ports;
pub mod providers;
pub mod registry;
pub mod settings;

pub use ports::{CoreError, ModelListError, ModelListPort};
pub use providers::{
    ProviderDirectory, ProviderId, ProviderRecord, ProviderRoute, ProviderUpdate, UnknownProvider,
};
pub use registry::{ModelRegistry, RefreshReport, RegistryEntry};
pub use settings::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_MANAGED_PORT, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_MAX_HEADER_BYTES, DEFAULT_ROUTER_PORT, DEFAULT_UPSTREAM_TIMEOUT, RouterSettings,
    SettingsError, validate_settings,
};
