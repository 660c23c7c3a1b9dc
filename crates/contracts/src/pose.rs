//! HumanPose - engine output
//!
//! The full-body pose handed to the rendering/retargeting backend once per
//! render tick, plus the per-tick diagnostics report.

use serde::{Deserialize, Serialize};

/// Full-body pose in destination space.
///
/// `channels` carries every per-joint value beyond the root transform. The
/// engine fills it with local joint rotations, four floats per joint, in
/// ascending bone id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanPose {
    /// Root translation
    pub body_position: [f32; 3],
    /// Root rotation, `[x, y, z, w]`
    pub body_rotation: [f32; 4],
    /// Per-joint channel values
    pub channels: Vec<f32>,
}

impl Default for HumanPose {
    fn default() -> Self {
        Self {
            body_position: [0.0; 3],
            body_rotation: [0.0, 0.0, 0.0, 1.0],
            channels: Vec::new(),
        }
    }
}

impl HumanPose {
    /// Rotation of joint `index` read from the channel block, `[x, y, z, w]`.
    pub fn joint_rotation(&self, index: usize) -> Option<[f32; 4]> {
        let start = index * 4;
        let c = self.channels.get(start..start + 4)?;
        Some([c[0], c[1], c[2], c[3]])
    }

    pub fn joint_count(&self) -> usize {
        self.channels.len() / 4
    }
}

/// Diagnostics for one render tick of one avatar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    /// Playback clock position, sender seconds
    pub virtual_now: f64,
    /// Adaptive delay currently applied, seconds
    pub current_delay: f64,
    /// Blend factor between the bracketing samples
    pub blend_factor: f64,
    /// Frames received during the last second
    pub arrival_rate: usize,
    /// Slot the pose was blended from
    pub last_slot: usize,
    /// Slot the pose was blended towards
    pub next_slot: usize,
    /// Hard resets since the skeleton was defined
    pub hard_resets: u64,
    /// Whether a pose was produced this tick
    pub emitted: bool,
}
