//! Retargeting descriptor - produced once per skeleton definition
//!
//! Consumed by the external humanoid-avatar build step, which maps the source
//! skeleton onto a differently proportioned rig.

use serde::{Deserialize, Serialize};

use crate::HumanoidRole;

/// One bone of the source hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonBone {
    pub name: String,
    /// `None` only for the synthetic root
    pub parent_name: Option<String>,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

/// Bone -> humanoid role assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanBone {
    pub bone_name: String,
    pub role: HumanoidRole,
}

/// Bone hierarchy plus humanoid blend parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetargetDescriptor {
    /// Name of the synthetic root created for this definition
    pub root_name: String,
    pub skeleton: Vec<SkeletonBone>,
    pub human: Vec<HumanBone>,
    pub upper_arm_twist: f32,
    pub lower_arm_twist: f32,
    pub upper_leg_twist: f32,
    pub lower_leg_twist: f32,
    pub arm_stretch: f32,
    pub leg_stretch: f32,
    pub feet_spacing: f32,
    pub has_translation_dof: bool,
}

impl RetargetDescriptor {
    /// Descriptor with the default humanoid parameters and no bones.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            skeleton: Vec::new(),
            human: Vec::new(),
            upper_arm_twist: 0.5,
            lower_arm_twist: 0.5,
            upper_leg_twist: 0.5,
            lower_leg_twist: 0.5,
            arm_stretch: 0.05,
            leg_stretch: 0.05,
            feet_spacing: 0.0,
            has_translation_dof: false,
        }
    }

    /// Parent name of a bone, looked up by name.
    pub fn parent_of(&self, bone_name: &str) -> Option<&str> {
        self.skeleton
            .iter()
            .find(|b| b.name == bone_name)
            .and_then(|b| b.parent_name.as_deref())
    }

    /// Bone name assigned to a humanoid role.
    pub fn bone_for(&self, role: HumanoidRole) -> Option<&str> {
        self.human
            .iter()
            .find(|h| h.role == role)
            .map(|h| h.bone_name.as_str())
    }
}
