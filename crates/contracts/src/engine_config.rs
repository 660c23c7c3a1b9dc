//! Pose engine configuration contracts shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Slots in the jitter buffer.
pub const BUFFER_CAPACITY: usize = 256;

/// Nominal source rate the buffer is sized for (Hz).
pub const NOMINAL_SOURCE_RATE_HZ: f64 = 50.0;

/// Longest delay the buffer can absorb: capacity expressed in seconds at the
/// nominal rate.
pub const MAX_DELAY_TIME: f64 = (1.0 / NOMINAL_SOURCE_RATE_HZ) * BUFFER_CAPACITY as f64;

/// Per-avatar engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PoseEngineConfig {
    /// Reflect incoming frames left/right
    #[serde(default)]
    pub mirroring: bool,

    /// Secondary smoothing strength, 0 disables
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub smoothing_factor: f32,

    /// How fast the playback delay decays towards the observed delay
    #[serde(default = "default_recovery_rate")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub delay_recovery_rate: f64,

    /// Render rate the smoothing weight is normalised against
    #[serde(default = "default_target_fps")]
    #[validate(range(exclusive_min = 0.0))]
    pub target_fps: f64,

    /// Empirically tuned clock constants
    #[serde(default)]
    #[validate(nested)]
    pub tuning: ClockTuning,
}

fn default_recovery_rate() -> f64 {
    0.1
}

fn default_target_fps() -> f64 {
    60.0
}

impl Default for PoseEngineConfig {
    fn default() -> Self {
        Self {
            mirroring: false,
            smoothing_factor: 0.0,
            delay_recovery_rate: default_recovery_rate(),
            target_fps: default_target_fps(),
            tuning: ClockTuning::default(),
        }
    }
}

/// Clock constants without a documented derivation. Kept configurable so
/// they can be calibrated against real hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClockTuning {
    /// Render ticks of scheduling slack discounted from each observed delay
    #[validate(range(min = 0.0))]
    pub frame_delta_discount: f64,

    /// Window after a manual buffer reset during which every frame re-anchors
    /// the stream (seconds)
    #[validate(range(min = 0.0))]
    pub reset_debounce_s: f64,
}

impl Default for ClockTuning {
    fn default() -> Self {
        Self {
            frame_delta_discount: 2.0,
            reset_debounce_s: 5.0,
        }
    }
}
