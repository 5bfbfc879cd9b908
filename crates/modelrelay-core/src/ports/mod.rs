//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.

pub mod model_list;

use thiserror::Error;

pub use model_list::{ModelListError, ModelListPort};

use crate::settings::SettingsError;

/// Top-level error for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Settings failed validation.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
