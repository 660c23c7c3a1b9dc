//! Pose session: owns one [`TrackedSkeleton`] and one sink per avatar.
//!
//! Constructed explicitly and passed around by the host; there is no global
//! instance. All calls happen on the render thread.

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{
    AvatarId, ContractError, FrameSample, MotionMessage, PoseEngineConfig, PoseEvent, PoseSink,
    RetargetDescriptor, SkeletonDefinition, SourcePacket, TickReport,
};
use tracing::{instrument, warn};

use crate::capture::PoseCapture;
use crate::engine::{PushOutcome, TrackedSkeleton};
use crate::realtime::RealtimeSource;

struct Avatar {
    skeleton: TrackedSkeleton,
    sink: Box<dyn PoseSink>,
    sink_errors: u64,
}

/// Per-tick result for one avatar.
#[derive(Debug, Clone)]
pub struct AvatarTick {
    pub avatar_id: AvatarId,
    pub report: TickReport,
}

/// Independent pose pipelines for several avatars sharing one render clock.
pub struct PoseSession<R> {
    clock: R,
    avatars: BTreeMap<AvatarId, Avatar>,
    last_tick: Option<f64>,
}

impl<R: RealtimeSource> PoseSession<R> {
    pub fn new(clock: R) -> Self {
        Self {
            clock,
            avatars: BTreeMap::new(),
            last_tick: None,
        }
    }

    /// Register an avatar with its own engine config and sink.
    ///
    /// # Errors
    /// `DuplicateAvatar` if the id is taken.
    pub fn add_avatar(
        &mut self,
        avatar_id: AvatarId,
        config: PoseEngineConfig,
        sink: Box<dyn PoseSink>,
    ) -> Result<(), ContractError> {
        let skeleton = TrackedSkeleton::new(avatar_id.clone(), config);
        self.insert(avatar_id, skeleton, sink)
    }

    /// As [`add_avatar`](Self::add_avatar), with a custom capture deciding
    /// what each buffer snapshot holds.
    ///
    /// # Errors
    /// `DuplicateAvatar` if the id is taken.
    pub fn add_avatar_with_capture(
        &mut self,
        avatar_id: AvatarId,
        config: PoseEngineConfig,
        sink: Box<dyn PoseSink>,
        capture: impl PoseCapture + 'static,
    ) -> Result<(), ContractError> {
        let skeleton = TrackedSkeleton::new(avatar_id.clone(), config).with_capture(capture);
        self.insert(avatar_id, skeleton, sink)
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }

    pub fn skeleton(&self, avatar_id: &str) -> Option<&TrackedSkeleton> {
        self.avatars.get(avatar_id).map(|a| &a.skeleton)
    }

    /// # Errors
    /// `UnknownAvatar`, or `DefinitionMismatch` for a malformed definition.
    pub fn define_skeleton(
        &mut self,
        avatar_id: &str,
        definition: &SkeletonDefinition,
    ) -> Result<Arc<RetargetDescriptor>, ContractError> {
        self.avatar_mut(avatar_id)?
            .skeleton
            .define_skeleton(definition)
    }

    /// # Errors
    /// `UnknownAvatar`, or `FrameMismatch` for a malformed sample.
    pub fn push_frame(
        &mut self,
        avatar_id: &str,
        sample: FrameSample,
    ) -> Result<PushOutcome, ContractError> {
        let now = self.clock.now();
        self.avatar_mut(avatar_id)?.skeleton.push_frame(sample, now)
    }

    /// # Errors
    /// `UnknownAvatar`.
    pub fn reset_buffer(&mut self, avatar_id: &str) -> Result<(), ContractError> {
        let now = self.clock.now();
        self.avatar_mut(avatar_id)?.skeleton.reset_buffer(now);
        Ok(())
    }

    /// Route a packet from a motion source.
    ///
    /// # Errors
    /// As [`define_skeleton`](Self::define_skeleton) and
    /// [`push_frame`](Self::push_frame).
    pub fn handle(&mut self, packet: SourcePacket) -> Result<(), ContractError> {
        match packet.message {
            MotionMessage::Skeleton(definition) => {
                self.define_skeleton(&packet.avatar_id, &definition)?;
            }
            MotionMessage::Frame(sample) => {
                self.push_frame(&packet.avatar_id, sample)?;
            }
        }
        Ok(())
    }

    /// Run one render tick for every avatar and hand emitted poses to their
    /// sinks. Sink failures are logged and counted, never propagated.
    #[instrument(level = "trace", name = "pose_session_tick", skip(self))]
    pub fn tick(&mut self) -> Vec<AvatarTick> {
        let now = self.clock.now();
        let delta = self.last_tick.map_or(0.0, |last| (now - last).max(0.0));
        self.last_tick = Some(now);

        let mut reports = Vec::with_capacity(self.avatars.len());
        for (avatar_id, avatar) in &mut self.avatars {
            if let Some(pose) = avatar.skeleton.tick(delta, now) {
                if let Err(e) = avatar.sink.apply(&pose) {
                    avatar.sink_errors += 1;
                    warn!(
                        avatar = %avatar_id,
                        sink = avatar.sink.name(),
                        error = %e,
                        "pose sink failed"
                    );
                    metrics::counter!("pose_sink_errors_total", "avatar" => avatar_id.to_string())
                        .increment(1);
                }
            }
            reports.push(AvatarTick {
                avatar_id: avatar_id.clone(),
                report: avatar.skeleton.report().clone(),
            });
        }
        reports
    }

    /// Events raised since the last call, grouped by avatar.
    pub fn drain_events(&mut self) -> Vec<(AvatarId, PoseEvent)> {
        self.avatars
            .iter_mut()
            .flat_map(|(id, avatar)| {
                avatar
                    .skeleton
                    .drain_events()
                    .into_iter()
                    .map(move |event| (id.clone(), event))
            })
            .collect()
    }

    /// Sink failures per avatar.
    pub fn sink_errors(&self, avatar_id: &str) -> Option<u64> {
        self.avatars.get(avatar_id).map(|a| a.sink_errors)
    }

    fn insert(
        &mut self,
        avatar_id: AvatarId,
        skeleton: TrackedSkeleton,
        sink: Box<dyn PoseSink>,
    ) -> Result<(), ContractError> {
        if self.avatars.contains_key(&avatar_id) {
            return Err(ContractError::DuplicateAvatar(avatar_id));
        }
        self.avatars.insert(
            avatar_id,
            Avatar {
                skeleton,
                sink,
                sink_errors: 0,
            },
        );
        Ok(())
    }

    fn avatar_mut(&mut self, avatar_id: &str) -> Result<&mut Avatar, ContractError> {
        self.avatars
            .get_mut(avatar_id)
            .ok_or_else(|| ContractError::UnknownAvatar(AvatarId::new(avatar_id)))
    }
}
