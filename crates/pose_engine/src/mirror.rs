//! Coordinate conversion and left/right mirroring.
//!
//! The capture source and the destination hierarchy disagree on handedness.
//! Conversion is a pair of sign flips, so it is its own inverse and exact in
//! floating point.

use contracts::{bone_table, FrameSample, RawPosition, RawRotation};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Source position to destination position: negate X.
#[inline]
pub fn to_destination_position(p: RawPosition) -> RawPosition {
    [-p[0], p[1], p[2]]
}

/// Source rotation to destination rotation: negate X and W.
#[inline]
pub fn to_destination_rotation(r: RawRotation) -> RawRotation {
    [-r[0], r[1], r[2], -r[3]]
}

#[inline]
pub fn position_vector(p: RawPosition) -> Vector3<f32> {
    Vector3::new(p[0], p[1], p[2])
}

/// `[x, y, z, w]` to a unit quaternion. Degenerate (zero-length) input maps
/// to identity.
#[inline]
pub fn rotation_quat(r: RawRotation) -> UnitQuaternion<f32> {
    UnitQuaternion::try_new(Quaternion::new(r[3], r[0], r[1], r[2]), f32::EPSILON)
        .unwrap_or_else(UnitQuaternion::identity)
}

/// Unit quaternion back to `[x, y, z, w]`.
#[inline]
pub fn rotation_xyzw(q: &UnitQuaternion<f32>) -> RawRotation {
    [q.i, q.j, q.k, q.w]
}

/// Bring `sample` into the requested mirror mode.
///
/// No-op when the sample is already in that mode. Otherwise swaps the pose of
/// every symmetric pair present on both sides, then negates rotation Y,
/// rotation Z and position X of every bone. Returns whether the sample
/// changed.
pub fn apply_mirroring(sample: &mut FrameSample, enabled: bool) -> bool {
    if sample.is_mirrored == enabled {
        return false;
    }

    for (left, right) in bone_table().mirror_pair_ids() {
        let (Some(l), Some(r)) = (sample.index_of(left), sample.index_of(right)) else {
            continue;
        };
        if l < sample.rotations.len() && r < sample.rotations.len() {
            sample.rotations.swap(l, r);
        }
        if l < sample.positions.len() && r < sample.positions.len() {
            sample.positions.swap(l, r);
        }
    }

    for rotation in &mut sample.rotations {
        rotation[1] = -rotation[1];
        rotation[2] = -rotation[2];
    }
    for position in &mut sample.positions {
        position[0] = -position[0];
    }

    sample.is_mirrored = enabled;
    true
}
