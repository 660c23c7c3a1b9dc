//! MotionSource trait - capture source abstraction
//!
//! Decouples the render loop from whatever produces skeleton definitions and
//! frame samples (a radio receiver, a file player, a synthetic generator).

use std::sync::Arc;

use crate::{AvatarId, FrameSample, SkeletonDefinition};

/// Inbound message from a capture source.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionMessage {
    /// Replaces the avatar's skeleton
    Skeleton(SkeletonDefinition),
    /// One pose sample
    Frame(FrameSample),
}

/// Message addressed to one avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePacket {
    pub avatar_id: AvatarId,
    pub message: MotionMessage,
}

impl SourcePacket {
    pub fn skeleton(avatar_id: AvatarId, definition: SkeletonDefinition) -> Self {
        Self {
            avatar_id,
            message: MotionMessage::Skeleton(definition),
        }
    }

    pub fn frame(avatar_id: AvatarId, sample: FrameSample) -> Self {
        Self {
            avatar_id,
            message: MotionMessage::Frame(sample),
        }
    }
}

/// Callback a source delivers packets through. May be invoked from any thread.
pub type MotionCallback = Arc<dyn Fn(SourcePacket) + Send + Sync>;

/// Capture source.
///
/// Implementations run on their own thread or callback context and hand every
/// packet to the registered callback; the consumer marshals packets onto the
/// render thread.
pub trait MotionSource: Send + Sync {
    /// Avatar this source drives
    fn avatar_id(&self) -> &AvatarId;

    /// Start delivering packets. Calling again while listening is a no-op.
    fn listen(&self, callback: MotionCallback);

    /// Stop delivering packets.
    fn stop(&self);

    fn is_listening(&self) -> bool;
}
