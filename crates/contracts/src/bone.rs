//! Bone naming table
//!
//! Fixed 27-bone humanoid layout used by the capture source. Only the parts
//! needed to build a hierarchy, map humanoid roles and mirror left/right are
//! described here.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Bone id as sent by the capture source.
pub type BoneId = i32;

/// Parent id marking a root bone.
pub const ROOT_PARENT_ID: BoneId = -1;

/// Source bone layout: (id, name).
pub const BONE_NAMES: [(BoneId, &str); 27] = [
    (0, "root"),
    (1, "torso_1"),
    (2, "torso_2"),
    (3, "torso_3"),
    (4, "torso_4"),
    (5, "torso_5"),
    (6, "torso_6"),
    (7, "torso_7"),
    (8, "neck_1"),
    (9, "neck_2"),
    (10, "head"),
    (11, "l_shoulder"),
    (12, "l_up_arm"),
    (13, "l_low_arm"),
    (14, "l_hand"),
    (15, "r_shoulder"),
    (16, "r_up_arm"),
    (17, "r_low_arm"),
    (18, "r_hand"),
    (19, "l_up_leg"),
    (20, "l_low_leg"),
    (21, "l_foot"),
    (22, "l_toes"),
    (23, "r_up_leg"),
    (24, "r_low_leg"),
    (25, "r_foot"),
    (26, "r_toes"),
];

/// Left/right pairs swapped when a frame is mirrored.
pub const MIRROR_PAIRS: [(&str, &str); 8] = [
    ("l_shoulder", "r_shoulder"),
    ("l_up_arm", "r_up_arm"),
    ("l_low_arm", "r_low_arm"),
    ("l_hand", "r_hand"),
    ("l_up_leg", "r_up_leg"),
    ("l_low_leg", "r_low_leg"),
    ("l_foot", "r_foot"),
    ("l_toes", "r_toes"),
];

/// Humanoid rig roles understood by the retargeting backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HumanoidRole {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
}

impl HumanoidRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hips => "Hips",
            Self::Spine => "Spine",
            Self::Chest => "Chest",
            Self::UpperChest => "UpperChest",
            Self::Neck => "Neck",
            Self::Head => "Head",
            Self::LeftShoulder => "LeftShoulder",
            Self::LeftUpperArm => "LeftUpperArm",
            Self::LeftLowerArm => "LeftLowerArm",
            Self::LeftHand => "LeftHand",
            Self::RightShoulder => "RightShoulder",
            Self::RightUpperArm => "RightUpperArm",
            Self::RightLowerArm => "RightLowerArm",
            Self::RightHand => "RightHand",
            Self::LeftUpperLeg => "LeftUpperLeg",
            Self::LeftLowerLeg => "LeftLowerLeg",
            Self::LeftFoot => "LeftFoot",
            Self::LeftToes => "LeftToes",
            Self::RightUpperLeg => "RightUpperLeg",
            Self::RightLowerLeg => "RightLowerLeg",
            Self::RightFoot => "RightFoot",
            Self::RightToes => "RightToes",
        }
    }
}

/// Source bone name -> humanoid role. Intermediate spine/neck segments have
/// no role and are carried by the hierarchy only.
const HUMANOID_ROLES: [(&str, HumanoidRole); 22] = [
    ("root", HumanoidRole::Hips),
    ("torso_2", HumanoidRole::Spine),
    ("torso_4", HumanoidRole::Chest),
    ("torso_6", HumanoidRole::UpperChest),
    ("neck_1", HumanoidRole::Neck),
    ("head", HumanoidRole::Head),
    ("l_shoulder", HumanoidRole::LeftShoulder),
    ("l_up_arm", HumanoidRole::LeftUpperArm),
    ("l_low_arm", HumanoidRole::LeftLowerArm),
    ("l_hand", HumanoidRole::LeftHand),
    ("r_shoulder", HumanoidRole::RightShoulder),
    ("r_up_arm", HumanoidRole::RightUpperArm),
    ("r_low_arm", HumanoidRole::RightLowerArm),
    ("r_hand", HumanoidRole::RightHand),
    ("l_up_leg", HumanoidRole::LeftUpperLeg),
    ("l_low_leg", HumanoidRole::LeftLowerLeg),
    ("l_foot", HumanoidRole::LeftFoot),
    ("l_toes", HumanoidRole::LeftToes),
    ("r_up_leg", HumanoidRole::RightUpperLeg),
    ("r_low_leg", HumanoidRole::RightLowerLeg),
    ("r_foot", HumanoidRole::RightFoot),
    ("r_toes", HumanoidRole::RightToes),
];

/// Bidirectional bone id <-> name lookup, built once per process.
#[derive(Debug)]
pub struct BoneTable {
    by_id: HashMap<BoneId, &'static str>,
    by_name: HashMap<&'static str, BoneId>,
    roles: HashMap<&'static str, HumanoidRole>,
}

impl BoneTable {
    fn build() -> Self {
        Self {
            by_id: BONE_NAMES.iter().copied().collect(),
            by_name: BONE_NAMES.iter().map(|&(id, name)| (name, id)).collect(),
            roles: HUMANOID_ROLES.iter().copied().collect(),
        }
    }

    /// Name of a bone id; `None` for ids outside the layout.
    #[inline]
    pub fn name(&self, id: BoneId) -> Option<&'static str> {
        self.by_id.get(&id).copied()
    }

    /// Bone id for a name.
    #[inline]
    pub fn id(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    /// Humanoid role of a bone name, if it has one.
    #[inline]
    pub fn role(&self, name: &str) -> Option<HumanoidRole> {
        self.roles.get(name).copied()
    }

    /// Mirror pairs resolved to ids.
    pub fn mirror_pair_ids(&self) -> impl Iterator<Item = (BoneId, BoneId)> + '_ {
        MIRROR_PAIRS
            .iter()
            .filter_map(|(left, right)| Some((self.id(left)?, self.id(right)?)))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

static TABLE: OnceLock<BoneTable> = OnceLock::new();

/// Process-wide bone table.
pub fn bone_table() -> &'static BoneTable {
    TABLE.get_or_init(BoneTable::build)
}
