//! CLI-specific error types and mappings to exit codes.

use modelrelay_core::{CoreError, SettingsError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid settings or environment configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (stdout closed, socket setup, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// The router or a provider call failed at runtime.
    #[error("{0}")]
    Runtime(String),
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// Exit codes follow sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Runtime(_) => 1,
            Self::Io(_) => 74,     // EX_IOERR
            Self::Config(_) => 78, // EX_CONFIG
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Settings(settings_err) => Self::from(settings_err),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Runtime("x".into()).exit_code(), 1);
        assert_eq!(CliError::Io("x".into()).exit_code(), 74);
        assert_eq!(CliError::Config("x".into()).exit_code(), 78);
    }

    #[test]
    fn test_settings_error_maps_to_config() {
        let err = CliError::from(CoreError::Settings(SettingsError::InvalidManagedPort));
        assert_eq!(err.exit_code(), 78);
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
