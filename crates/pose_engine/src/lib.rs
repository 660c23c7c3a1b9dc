//! # Pose Engine
//!
//! Real-time skeletal pose pipeline.
//!
//! Responsible for:
//! - Building a bone hierarchy from a flat skeleton definition
//! - Mirroring and staging incoming frame samples
//! - Buffering pose snapshots in a fixed jitter buffer
//! - Estimating network delay with an adaptive playback clock
//! - Interpolating and smoothing the pose emitted every render tick
//! - Tracking the frame arrival rate
//!
//! ## Usage
//!
//! ```ignore
//! use pose_engine::{MonotonicClock, PoseSession, LatestPoseSink};
//!
//! let mut session = PoseSession::new(MonotonicClock::new());
//! session.add_avatar("performer".into(), PoseEngineConfig::default(), Box::new(LatestPoseSink::new()))?;
//!
//! // From the ingest queue
//! session.handle(packet)?;
//!
//! // Once per render frame
//! for tick in session.tick() {
//!     println!("{}: delay {:.3}s", tick.avatar_id, tick.report.current_delay);
//! }
//! for (avatar, event) in session.drain_events() {
//!     // descriptor, ready, buffer resets
//! }
//! ```

mod buffer;
mod capture;
mod clock;
mod engine;
mod ingest;
mod interpolate;
mod mirror;
mod rate;
mod realtime;
mod session;
mod sinks;
mod skeleton;

pub use buffer::{BufferSlot, JitterBuffer};
pub use capture::{HumanPoseCapture, PoseCapture};
pub use clock::{PlaybackClock, ReceivedMark};
pub use engine::{PushOutcome, TrackedSkeleton};
pub use ingest::{PoseArena, StagedPose};
pub use interpolate::{
    blend_poses, slerp, smoothing_weight, Blended, PoseInterpolator, PoseSmoother,
};
pub use mirror::{
    apply_mirroring, position_vector, rotation_quat, rotation_xyzw, to_destination_position,
    to_destination_rotation,
};
pub use rate::{ArrivalRateEstimator, RATE_WINDOW_S, WINDOW_CAPACITY};
pub use realtime::{ManualClock, MonotonicClock, RealtimeSource};
pub use session::{AvatarTick, PoseSession};
pub use sinks::{sink_for, LatestPoseSink, LogSink, NullSink};
pub use skeleton::{BoneGraph, BoneNode, SYNTHETIC_ROOT_NAME};

// Re-export contracts types
pub use contracts::{
    FrameSample, HumanPose, PoseEngineConfig, PoseEvent, ResetReason, RetargetDescriptor,
    SkeletonDefinition, TickReport,
};
