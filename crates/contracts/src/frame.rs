//! Skeleton definitions and frame samples - inbound data from the capture source
//!
//! Both arrive as parallel flat arrays indexed by bone. Values are in the
//! source's coordinate convention; conversion happens in the engine.

use serde::{Deserialize, Serialize};

use crate::{BoneId, ContractError};

/// Frame id used by sources without a stable sequence (file playback).
pub const FILE_PLAYBACK_FRAME_ID: i32 = -1;

/// Rotation quaternion as sent by the source, `[x, y, z, w]`.
pub type RawRotation = [f32; 4];

/// Position as sent by the source, `[x, y, z]`.
pub type RawPosition = [f32; 3];

/// Flat bone description defining a skeleton.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDefinition {
    pub bone_ids: Vec<BoneId>,
    /// Parent per bone, `-1` for roots
    pub parent_bone_ids: Vec<BoneId>,
    pub rotations: Vec<RawRotation>,
    pub positions: Vec<RawPosition>,
}

impl SkeletonDefinition {
    /// Check that all four arrays share one length and return it.
    ///
    /// # Errors
    /// `DefinitionMismatch` naming the first array whose length differs from
    /// `bone_ids`.
    pub fn validate(&self) -> Result<usize, ContractError> {
        let n = self.bone_ids.len();
        check_len("parent_bone_ids", n, self.parent_bone_ids.len())
            .and_then(|_| check_len("rotations", n, self.rotations.len()))
            .and_then(|_| check_len("positions", n, self.positions.len()))
            .map_err(|(field, actual)| ContractError::DefinitionMismatch {
                field,
                expected: n,
                actual,
            })?;
        Ok(n)
    }

    pub fn len(&self) -> usize {
        self.bone_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bone_ids.is_empty()
    }
}

/// One pose sample from the stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Sequence id, `-1` when the source has none
    pub frame_id: i32,
    /// Sender clock, seconds
    pub timestamp: f64,
    pub bone_ids: Vec<BoneId>,
    pub rotations: Vec<RawRotation>,
    pub positions: Vec<RawPosition>,
    /// Whether left/right mirroring has already been applied to this sample
    #[serde(default)]
    pub is_mirrored: bool,
}

impl FrameSample {
    pub fn new(
        frame_id: i32,
        timestamp: f64,
        bone_ids: Vec<BoneId>,
        rotations: Vec<RawRotation>,
        positions: Vec<RawPosition>,
    ) -> Self {
        Self {
            frame_id,
            timestamp,
            bone_ids,
            rotations,
            positions,
            is_mirrored: false,
        }
    }

    /// # Errors
    /// `FrameMismatch` when the pose arrays are not as long as `bone_ids`.
    pub fn validate(&self) -> Result<usize, ContractError> {
        let n = self.bone_ids.len();
        check_len("rotations", n, self.rotations.len())
            .and_then(|_| check_len("positions", n, self.positions.len()))
            .map_err(|(field, actual)| ContractError::FrameMismatch {
                frame_id: self.frame_id,
                field,
                expected: n,
                actual,
            })?;
        Ok(n)
    }

    #[inline]
    pub fn is_file_playback(&self) -> bool {
        self.frame_id == FILE_PLAYBACK_FRAME_ID
    }

    /// Index of a bone inside this frame (linear scan, frames are small).
    #[inline]
    pub fn index_of(&self, bone_id: BoneId) -> Option<usize> {
        self.bone_ids.iter().position(|&id| id == bone_id)
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), (&'static str, usize)> {
    if expected == actual {
        Ok(())
    } else {
        Err((field, actual))
    }
}
