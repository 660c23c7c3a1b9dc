//! Layered error definitions
//!
//! Categorized by source: config / definition / stream / sink

use thiserror::Error;

use crate::AvatarId;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Definition Errors =====
    /// Skeleton definition arrays disagree in length
    #[error("skeleton definition '{field}' has {actual} entries, expected {expected}")]
    DefinitionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Frame sample arrays disagree in length
    #[error("frame {frame_id}: '{field}' has {actual} entries, expected {expected}")]
    FrameMismatch {
        frame_id: i32,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    // ===== Session Errors =====
    /// Avatar not registered with the session
    #[error("unknown avatar: {0}")]
    UnknownAvatar(AvatarId),

    /// Avatar registered twice
    #[error("avatar already registered: {0}")]
    DuplicateAvatar(AvatarId),

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
