//! Reference humanoid: the 27-bone layout in a T-stance bind pose.
//!
//! Used by the mock source and as a fixture. Arms hang off the upper torso,
//! legs off the hips. Head height is 1.73 m.

use crate::{BoneId, FrameSample, SkeletonDefinition, BONE_NAMES};

/// Parent of every bone, indexed like [`BONE_NAMES`].
pub const REFERENCE_PARENTS: [BoneId; 27] = [
    -1, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, // hips, torso, neck, head
    7, 11, 12, 13, // left arm
    7, 15, 16, 17, // right arm
    0, 19, 20, 21, // left leg
    0, 23, 24, 25, // right leg
];

const IDENTITY: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Local offset of a bone from its parent.
pub fn reference_offset(id: BoneId) -> [f32; 3] {
    match id {
        0 => [0.0, 0.95, 0.0],
        1..=7 => [0.0, 0.08, 0.0],
        8 | 9 => [0.0, 0.06, 0.0],
        10 => [0.0, 0.1, 0.0],
        11 => [0.08, 0.0, 0.0],
        15 => [-0.08, 0.0, 0.0],
        12..=14 => [0.25, 0.0, 0.0],
        16..=18 => [-0.25, 0.0, 0.0],
        19 => [0.1, -0.05, 0.0],
        23 => [-0.1, -0.05, 0.0],
        _ => [0.0, -0.4, 0.0],
    }
}

fn reference_ids() -> Vec<BoneId> {
    BONE_NAMES.iter().map(|(id, _)| *id).collect()
}

fn reference_positions() -> Vec<[f32; 3]> {
    BONE_NAMES.iter().map(|(id, _)| reference_offset(*id)).collect()
}

/// Bind-pose definition with identity rotations.
pub fn reference_skeleton() -> SkeletonDefinition {
    SkeletonDefinition {
        bone_ids: reference_ids(),
        parent_bone_ids: REFERENCE_PARENTS.to_vec(),
        rotations: vec![IDENTITY; BONE_NAMES.len()],
        positions: reference_positions(),
    }
}

/// Full-body frame in the bind pose with the hips moved to `hips_x`.
pub fn reference_frame(frame_id: i32, timestamp: f64, hips_x: f32) -> FrameSample {
    let mut positions = reference_positions();
    positions[0][0] = hips_x;
    FrameSample::new(
        frame_id,
        timestamp,
        reference_ids(),
        vec![IDENTITY; BONE_NAMES.len()],
        positions,
    )
}
