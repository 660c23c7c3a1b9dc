//! Staged bone pose arena.
//!
//! Frame ingest writes converted local transforms here; the jitter-buffer
//! snapshot reads them back through a [`PoseCapture`](crate::PoseCapture).
//! Entries are addressed by the bone's slot in the [`BoneGraph`].

use contracts::FrameSample;
use nalgebra::{UnitQuaternion, Vector3};

use crate::mirror::{position_vector, rotation_quat, to_destination_position, to_destination_rotation};
use crate::skeleton::BoneGraph;

/// Latest local transform of one bone, destination space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagedPose {
    /// Only updated for root-level bones
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Default for StagedPose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }
}

/// Staged poses indexed by bone slot.
#[derive(Debug, Clone, Default)]
pub struct PoseArena {
    slots: Vec<StagedPose>,
}

impl PoseArena {
    /// Arena seeded with the bind pose of every bone in `graph`.
    pub fn from_graph(graph: &BoneGraph) -> Self {
        let slots = (0..graph.slot_count())
            .map(|key| {
                graph
                    .node(key)
                    .map(|node| StagedPose {
                        position: node.local_position,
                        rotation: node.local_rotation,
                    })
                    .unwrap_or_default()
            })
            .collect();
        Self { slots }
    }

    #[inline]
    pub fn get(&self, key: usize) -> Option<&StagedPose> {
        self.slots.get(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Stage every bone of `sample` that exists in `graph`.
    ///
    /// The sample must already be in the desired mirror mode. Bones the graph
    /// does not know are skipped. Returns the number of bones staged.
    pub fn stage_frame(&mut self, graph: &BoneGraph, sample: &FrameSample) -> usize {
        let mut staged = 0;
        let bones = sample
            .bone_ids
            .iter()
            .zip(&sample.rotations)
            .zip(&sample.positions);

        for ((&bone_id, &rotation), &position) in bones {
            let Some(key) = graph.key_of(bone_id) else {
                continue;
            };
            let Some(slot) = self.slots.get_mut(key) else {
                continue;
            };
            slot.rotation = rotation_quat(to_destination_rotation(rotation));
            if graph.is_root_level(key) {
                slot.position = position_vector(to_destination_position(position));
            }
            staged += 1;
        }
        staged
    }
}
