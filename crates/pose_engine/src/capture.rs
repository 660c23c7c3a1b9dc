//! Pose capture: reads staged bone state into the representation stored in
//! the jitter buffer.

use contracts::HumanPose;

use crate::ingest::PoseArena;
use crate::mirror::rotation_xyzw;
use crate::skeleton::BoneGraph;

/// Produces the full-body pose snapshot written into a buffer slot.
pub trait PoseCapture: Send {
    fn capture(&self, graph: &BoneGraph, staged: &PoseArena) -> HumanPose;
}

impl<F> PoseCapture for F
where
    F: Fn(&BoneGraph, &PoseArena) -> HumanPose + Send,
{
    fn capture(&self, graph: &BoneGraph, staged: &PoseArena) -> HumanPose {
        self(graph, staged)
    }
}

/// Default capture.
///
/// The root-level bone with the lowest id drives the body transform; every
/// other bone contributes its local rotation (`[x, y, z, w]`) to the channel
/// block in ascending id order.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanPoseCapture;

impl PoseCapture for HumanPoseCapture {
    fn capture(&self, graph: &BoneGraph, staged: &PoseArena) -> HumanPose {
        let body = graph.bones().find(|(_, node)| node.root_level).map(|(key, _)| key);

        let mut pose = HumanPose {
            channels: Vec::with_capacity(graph.len().saturating_sub(1) * 4),
            ..Default::default()
        };

        for (key, _) in graph.bones() {
            let Some(bone) = staged.get(key) else {
                continue;
            };
            if Some(key) == body {
                pose.body_position = bone.position.into();
                pose.body_rotation = rotation_xyzw(&bone.rotation);
            } else {
                pose.channels.extend_from_slice(&rotation_xyzw(&bone.rotation));
            }
        }
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::reference_skeleton;
    use contracts::FrameSample;

    #[test]
    fn test_capture_layout() {
        let graph = BoneGraph::build(&reference_skeleton()).unwrap();
        let mut arena = PoseArena::from_graph(&graph);
        arena.stage_frame(
            &graph,
            &FrameSample::new(
                1,
                0.0,
                vec![0, 1],
                vec![[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.6, 0.8]],
                vec![[0.0, 1.1, 0.0], [0.0; 3]],
            ),
        );

        let pose = HumanPoseCapture.capture(&graph, &arena);
        assert_eq!(pose.body_position, [-0.0, 1.1, 0.0]);
        assert_eq!(pose.joint_count(), 26);

        // torso_1 is the first channel; conversion negated w (and x)
        let torso = pose.joint_rotation(0).unwrap();
        assert!((torso[2] - 0.6).abs() < 1e-6 && (torso[3] + 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_closure_capture() {
        let graph = BoneGraph::build(&reference_skeleton()).unwrap();
        let arena = PoseArena::from_graph(&graph);
        let capture = |g: &BoneGraph, _: &PoseArena| HumanPose {
            channels: vec![g.len() as f32],
            ..Default::default()
        };
        assert_eq!(capture.capture(&graph, &arena).channels, vec![27.0]);
    }
}
