//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Session could not be assembled from the configuration
    #[error("Failed to set up session: {message}")]
    SessionSetup { message: String },

    /// Configuration failed validation
    #[error("Configuration validation failed: {path}")]
    ConfigInvalid { path: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn session_setup(message: impl Into<String>) -> Self {
        Self::SessionSetup {
            message: message.into(),
        }
    }

    pub fn config_invalid(path: impl Into<String>) -> Self {
        Self::ConfigInvalid { path: path.into() }
    }
}
