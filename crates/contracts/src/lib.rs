//! # Contracts
//!
//! Interface contracts shared by every crate in the workspace: inbound
//! skeleton/frame data, outbound poses and events, configuration and errors.
//! Business crates depend on this crate only, reverse dependencies are
//! prohibited.
//!
//! ## Time Model
//! - Frame timestamps are sender-clock seconds (f64)
//! - Realtime is receiver-clock seconds (f64) since an arbitrary epoch
//! - `frame_id` orders samples; `-1` marks sources without a sequence

mod avatar_id;
mod blueprint;
mod bone;
mod engine_config;
mod error;
mod events;
mod frame;
mod motion_source;
mod pose;
mod reference;
mod retarget;
mod sink;

pub use avatar_id::AvatarId;
pub use blueprint::*;
pub use bone::*;
pub use engine_config::*;
pub use error::*;
pub use events::*;
pub use frame::*;
pub use motion_source::{MotionCallback, MotionMessage, MotionSource, SourcePacket};
pub use pose::*;
pub use reference::*;
pub use retarget::*;
pub use sink::*;
