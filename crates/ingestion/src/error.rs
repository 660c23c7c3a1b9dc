//! Ingestion error types

use contracts::AvatarId;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Another source already drives this avatar
    #[error("a source is already registered for avatar {avatar_id}")]
    DuplicateSource {
        /// Avatar id
        avatar_id: AvatarId,
    },

    /// No source registered for this avatar
    #[error("no source registered for avatar {avatar_id}")]
    UnknownSource {
        /// Avatar id
        avatar_id: AvatarId,
    },

    /// Receiver side of the queue is gone
    #[error("ingestion queue closed for avatar {avatar_id}")]
    ChannelClosed {
        /// Avatar id
        avatar_id: AvatarId,
    },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
