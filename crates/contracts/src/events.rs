//! Engine events polled by the host once per tick.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::RetargetDescriptor;

/// Why the jitter buffer was cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    /// First sample since the buffer was last cleared
    FirstSample,
    /// Frame id and timestamp both went backwards
    StreamRewound,
    /// File playback started after a live stream
    FilePlaybackStarted,
    /// Inside the debounce window of a manual reset
    ManualReset,
}

impl ResetReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstSample => "first_sample",
            Self::StreamRewound => "stream_rewound",
            Self::FilePlaybackStarted => "file_playback_started",
            Self::ManualReset => "manual_reset",
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications raised by a tracked skeleton
#[derive(Debug, Clone, PartialEq)]
pub enum PoseEvent {
    /// A skeleton definition was accepted
    SkeletonDefined {
        descriptor: Arc<RetargetDescriptor>,
        /// World height of the head bone in the bind pose
        head_height: f32,
    },
    /// First pose emitted since the skeleton was defined
    SkeletonReady,
    /// The jitter buffer was cleared
    BufferReset { reason: ResetReason },
}
