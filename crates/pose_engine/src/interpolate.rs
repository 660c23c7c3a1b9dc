//! Pose interpolation between buffered samples and secondary smoothing.

use contracts::HumanPose;
use nalgebra::{UnitQuaternion, Vector3};

use crate::buffer::JitterBuffer;
use crate::mirror::{rotation_quat, rotation_xyzw};

const SLERP_EPSILON: f32 = 1.0e-6;

/// Heaviest weight the smoother gives to the previous pose.
const MIN_FRESH_WEIGHT: f32 = 0.3;

/// Floats per joint rotation in the channel block (`[x, y, z, w]`).
const JOINT_WIDTH: usize = 4;

/// Spherical interpolation that falls back to nlerp where slerp is undefined.
#[inline]
pub fn slerp(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    a.try_slerp(b, t, SLERP_EPSILON)
        .unwrap_or_else(|| a.nlerp(b, t))
}

/// Blend `a` towards `b` by `t`: lerp position, slerp root rotation, lerp
/// every channel. Channels missing from `a` are taken from `b`.
pub fn blend_poses(a: &HumanPose, b: &HumanPose, t: f32) -> HumanPose {
    let position = Vector3::from(a.body_position).lerp(&Vector3::from(b.body_position), t);
    let rotation = slerp(
        &rotation_quat(a.body_rotation),
        &rotation_quat(b.body_rotation),
        t,
    );

    HumanPose {
        body_position: position.into(),
        body_rotation: rotation_xyzw(&rotation),
        channels: blend_channels(&a.channels, &b.channels, t),
    }
}

/// Lerp joint blocks, flipping `to` onto the hemisphere of `from` first.
///
/// `q` and `-q` are the same rotation; without the flip their halfway point
/// is the zero quaternion.
fn blend_channels(a: &[f32], b: &[f32], t: f32) -> Vec<f32> {
    let mut channels = Vec::with_capacity(b.len());
    for (block, to) in b.chunks(JOINT_WIDTH).enumerate() {
        let start = block * JOINT_WIDTH;
        let from = a.get(start..start + to.len()).unwrap_or(to);
        let dot: f32 = from.iter().zip(to).map(|(f, g)| f * g).sum();
        let sign = if to.len() == JOINT_WIDTH && dot < 0.0 { -1.0 } else { 1.0 };
        channels.extend(from.iter().zip(to).map(|(&f, &g)| f + (sign * g - f) * t));
    }
    channels
}

/// Result of one render step.
#[derive(Debug, Clone)]
pub struct Blended {
    pub pose: HumanPose,
    pub blend_factor: f64,
    pub last_slot: usize,
    pub next_slot: usize,
}

/// Walks the jitter buffer forward as the virtual clock advances.
#[derive(Debug, Clone, Default)]
pub struct PoseInterpolator {
    last_slot: Option<usize>,
}

impl PoseInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart the walk at `slot`, used after a hard reset.
    pub fn anchor(&mut self, slot: usize) {
        self.last_slot = Some(slot);
    }

    pub fn clear(&mut self) {
        self.last_slot = None;
    }

    #[inline]
    pub fn last_slot(&self) -> Option<usize> {
        self.last_slot
    }

    /// Blend the two samples bracketing `virtual_now`.
    ///
    /// Moves the "last" pointer forward while the next sample is already in
    /// the past, never backward. With no newer sample the last pose is held.
    /// A "last" slot invalidated by a later write still blends out of its
    /// kept pose. Returns `None` until the buffer holds a pose.
    pub fn render(&mut self, buffer: &JitterBuffer<HumanPose>, virtual_now: f64) -> Option<Blended> {
        let mut last = self.last_slot.or_else(|| buffer.last_write())?;
        let mut next = buffer.find_next_pose(last);

        for _ in 0..buffer.capacity() {
            if next == last {
                break;
            }
            match buffer.slot(next) {
                Some(slot) if slot.timestamp < virtual_now => {
                    last = next;
                    next = buffer.find_next_pose(last);
                }
                _ => break,
            }
        }
        self.last_slot = Some(last);

        let from = buffer.slot(last)?;
        let to = buffer.slot(next)?;
        let (from_pose, to_pose) = match (from.pose.as_ref(), to.pose.as_ref()) {
            (Some(f), Some(t)) => (f, t),
            (Some(f), None) => (f, f),
            (None, Some(t)) => (t, t),
            (None, None) => return None,
        };

        let span = to.timestamp - from.timestamp;
        let blend_factor = if from.frame_id == to.frame_id || span <= 0.0 {
            1.0
        } else {
            ((virtual_now - from.timestamp) / span).clamp(0.0, 1.0)
        };

        Some(Blended {
            pose: blend_poses(from_pose, to_pose, blend_factor as f32),
            blend_factor,
            last_slot: last,
            next_slot: next,
        })
    }
}

/// Weight of the fresh pose: `lerp(1.0, 0.3, clamp01(delta * fps * factor))`.
#[inline]
pub fn smoothing_weight(delta: f64, target_fps: f64, factor: f32) -> f32 {
    let x = (delta * target_fps * factor as f64).clamp(0.0, 1.0) as f32;
    1.0 + (MIN_FRESH_WEIGHT - 1.0) * x
}

/// Exponential smoothing across render ticks.
#[derive(Debug, Clone, Default)]
pub struct PoseSmoother {
    factor: Option<f32>,
    state: Option<HumanPose>,
}

impl PoseSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.factor = None;
        self.state = None;
    }

    /// Smooth `fresh` against the previous output.
    ///
    /// A factor of 0 passes poses through. A factor different from the
    /// previous tick's restarts smoothing from `fresh`.
    pub fn apply(&mut self, fresh: HumanPose, delta: f64, target_fps: f64, factor: f32) -> HumanPose {
        let changed = self.factor != Some(factor);
        self.factor = Some(factor);

        if factor <= 0.0 {
            self.state = None;
            return fresh;
        }

        let smoothed = match self.state.take() {
            Some(previous) if !changed => {
                let weight = smoothing_weight(delta, target_fps, factor);
                blend_poses(&previous, &fresh, weight)
            }
            _ => fresh,
        };
        self.state = Some(smoothed.clone());
        smoothed
    }
}
