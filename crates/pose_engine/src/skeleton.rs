//! Skeleton builder.
//!
//! Turns a flat [`SkeletonDefinition`] into an owned bone hierarchy.
//!
//! Nodes live in a `Slab`; a node's slab key is its stable slot, shared with
//! the staged-pose arena so per-frame staging never goes through a map.
//! The graph is rebuilt wholesale on every definition and never mutated in
//! between, so keys are dense (`0..slot_count()`), key 0 being the synthetic
//! root.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use contracts::{
    bone_table, BoneId, ContractError, HumanBone, HumanoidRole, RetargetDescriptor, SkeletonBone,
    SkeletonDefinition, ROOT_PARENT_ID,
};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use slab::Slab;
use tracing::{debug, instrument, warn};

use crate::mirror::{
    position_vector, rotation_quat, rotation_xyzw, to_destination_position,
    to_destination_rotation,
};

/// Name of the root node added to every definition.
pub const SYNTHETIC_ROOT_NAME: &str = "mocap_root";

/// One node of the bone hierarchy, local transform in destination space.
#[derive(Debug, Clone)]
pub struct BoneNode {
    /// `None` for the synthetic root
    pub bone_id: Option<BoneId>,
    pub name: &'static str,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub local_position: Vector3<f32>,
    pub local_rotation: UnitQuaternion<f32>,
    /// Attached to the synthetic root because the source gave no usable parent
    pub root_level: bool,
}

impl BoneNode {
    fn synthetic_root() -> Self {
        Self {
            bone_id: None,
            name: SYNTHETIC_ROOT_NAME,
            parent: None,
            children: Vec::new(),
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::identity(),
            root_level: false,
        }
    }

    #[inline]
    pub fn local_transform(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.local_position), self.local_rotation)
    }
}

/// Owned bone hierarchy built from one skeleton definition.
pub struct BoneGraph {
    nodes: Slab<BoneNode>,
    root: usize,
    by_id: HashMap<BoneId, usize>,
    /// Bone keys in ascending bone id order
    order: Vec<usize>,
    head_height: f32,
    descriptor: Arc<RetargetDescriptor>,
}

impl fmt::Debug for BoneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoneGraph")
            .field("bones", &self.order.len())
            .field("head_height", &self.head_height)
            .finish()
    }
}

impl BoneGraph {
    /// Build the hierarchy.
    ///
    /// Ids without a name in the bone table are skipped, as are repeated ids.
    /// Bones whose parent is `-1`, unknown or skipped hang off the synthetic
    /// root.
    ///
    /// # Errors
    /// `DefinitionMismatch` when the definition arrays differ in length.
    #[instrument(
        level = "debug",
        name = "skeleton_build",
        skip(definition),
        fields(bones = definition.len())
    )]
    pub fn build(definition: &SkeletonDefinition) -> Result<Self, ContractError> {
        let n = definition.validate().inspect_err(|e| {
            warn!(error = %e, "rejecting malformed skeleton definition");
        })?;
        let table = bone_table();

        let mut nodes = Slab::with_capacity(n + 1);
        let root = nodes.insert(BoneNode::synthetic_root());
        let mut by_id = HashMap::with_capacity(n);
        let mut pending = Vec::with_capacity(n);

        for i in 0..n {
            let bone_id = definition.bone_ids[i];
            let Some(name) = table.name(bone_id) else {
                debug!(bone_id, "skipping unmapped bone id");
                continue;
            };
            if by_id.contains_key(&bone_id) {
                debug!(bone_id, "skipping repeated bone id");
                continue;
            }

            let key = nodes.insert(BoneNode {
                bone_id: Some(bone_id),
                name,
                parent: None,
                children: Vec::new(),
                local_position: position_vector(to_destination_position(definition.positions[i])),
                local_rotation: rotation_quat(to_destination_rotation(definition.rotations[i])),
                root_level: false,
            });
            by_id.insert(bone_id, key);
            pending.push((key, definition.parent_bone_ids[i]));
        }

        // Locals are relative to the parent, so attaching never rewrites them.
        for (key, parent_id) in pending {
            let parent = match by_id.get(&parent_id) {
                Some(&p) if parent_id != ROOT_PARENT_ID && p != key => p,
                _ => root,
            };
            nodes[key].parent = Some(parent);
            nodes[key].root_level = parent == root;
            nodes[parent].children.push(key);
        }

        let mut order: Vec<usize> = by_id.values().copied().collect();
        order.sort_by_key(|&key| nodes[key].bone_id);

        let mut graph = Self {
            nodes,
            root,
            by_id,
            order,
            head_height: 0.0,
            descriptor: Arc::new(RetargetDescriptor::new(SYNTHETIC_ROOT_NAME)),
        };
        graph.head_height = graph.compute_head_height();
        graph.descriptor = Arc::new(graph.build_descriptor());

        debug!(
            bones = graph.order.len(),
            skipped = n - graph.order.len(),
            head_height = graph.head_height,
            "skeleton built"
        );
        Ok(graph)
    }

    #[inline]
    pub fn root(&self) -> usize {
        self.root
    }

    /// Slot of a bone id, if the bone is part of the graph.
    #[inline]
    pub fn key_of(&self, bone_id: BoneId) -> Option<usize> {
        self.by_id.get(&bone_id).copied()
    }

    #[inline]
    pub fn node(&self, key: usize) -> Option<&BoneNode> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn is_root_level(&self, key: usize) -> bool {
        self.nodes.get(key).is_some_and(|n| n.root_level)
    }

    /// Bones (synthetic root excluded) in ascending id order.
    pub fn bones(&self) -> impl Iterator<Item = (usize, &BoneNode)> + '_ {
        self.order.iter().map(move |&key| (key, &self.nodes[key]))
    }

    /// Number of bones, synthetic root excluded.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Upper bound (exclusive) of the slot keys in use.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// World height of the Head bone in the bind pose, 0 without one.
    #[inline]
    pub fn head_height(&self) -> f32 {
        self.head_height
    }

    #[inline]
    pub fn descriptor(&self) -> &Arc<RetargetDescriptor> {
        &self.descriptor
    }

    /// Compose local transforms up to the synthetic root.
    pub fn world_transform(&self, key: usize) -> Option<Isometry3<f32>> {
        let mut node = self.nodes.get(key)?;
        let mut world = node.local_transform();
        // Cycles are excluded upstream; the hop limit keeps a bad definition
        // from spinning forever.
        for _ in 0..self.nodes.len() {
            let Some(parent) = node.parent.and_then(|p| self.nodes.get(p)) else {
                break;
            };
            world = parent.local_transform() * world;
            node = parent;
        }
        Some(world)
    }

    fn compute_head_height(&self) -> f32 {
        let table = bone_table();
        self.bones()
            .find(|(_, node)| table.role(node.name) == Some(HumanoidRole::Head))
            .and_then(|(key, _)| self.world_transform(key))
            .map(|world| world.translation.vector.y)
            .unwrap_or(0.0)
    }

    fn build_descriptor(&self) -> RetargetDescriptor {
        let table = bone_table();
        let mut descriptor = RetargetDescriptor::new(SYNTHETIC_ROOT_NAME);

        descriptor.skeleton.push(SkeletonBone {
            name: SYNTHETIC_ROOT_NAME.to_string(),
            parent_name: None,
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
        });

        for (_, node) in self.bones() {
            let parent_name = node
                .parent
                .and_then(|p| self.nodes.get(p))
                .map(|p| p.name.to_string());
            descriptor.skeleton.push(SkeletonBone {
                name: node.name.to_string(),
                parent_name,
                position: node.local_position.into(),
                rotation: rotation_xyzw(&node.local_rotation),
            });
            if let Some(role) = table.role(node.name) {
                descriptor.human.push(HumanBone {
                    bone_name: node.name.to_string(),
                    role,
                });
            }
        }

        descriptor
    }
}
