//! Tracked skeleton: one avatar's complete pose pipeline.

use std::fmt;
use std::sync::Arc;

use contracts::{
    AvatarId, ContractError, FrameSample, HumanPose, PoseEngineConfig, PoseEvent, ResetReason,
    RetargetDescriptor, SkeletonDefinition, TickReport, FILE_PLAYBACK_FRAME_ID,
};
use tracing::{debug, instrument, trace};

use crate::buffer::JitterBuffer;
use crate::capture::{HumanPoseCapture, PoseCapture};
use crate::clock::PlaybackClock;
use crate::ingest::PoseArena;
use crate::interpolate::{PoseInterpolator, PoseSmoother};
use crate::mirror::apply_mirroring;
use crate::rate::ArrivalRateEstimator;
use crate::skeleton::BoneGraph;

/// What happened to a pushed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PushOutcome {
    /// Written to the jitter buffer
    Buffered {
        slot: usize,
        reset: Option<ResetReason>,
        virtual_now: f64,
    },
    /// Dropped, no skeleton defined yet
    NoSkeleton,
}

/// Skeleton builder, ingest, jitter buffer, clock, interpolator and rate
/// estimator for one avatar.
///
/// Runs entirely on the caller's thread. Events are queued and handed out by
/// [`drain_events`](Self::drain_events).
pub struct TrackedSkeleton {
    /// Name used in logs, metrics and reports
    avatar_id: AvatarId,
    /// Engine tuning
    config: PoseEngineConfig,
    /// Bone graph from the last definition (None until defined)
    graph: Option<BoneGraph>,
    /// Per-bone state staged from incoming frames
    staged: PoseArena,
    /// Captured poses keyed by frame id
    buffer: JitterBuffer<HumanPose>,
    /// Virtual playback time and adaptive delay
    clock: PlaybackClock,
    /// Forward-only walk over the buffer
    interpolator: PoseInterpolator,
    /// Optional exponential smoothing of rendered poses
    smoother: PoseSmoother,
    /// Sender-side frame rate over the last second
    arrival: ArrivalRateEstimator,
    /// Turns staged bone state into a buffered pose
    capture: Box<dyn PoseCapture>,
    /// Events waiting for `drain_events`
    events: Vec<PoseEvent>,
    /// Realtime of the last manual reset; frames inside the debounce window re-anchor
    manual_reset_at: Option<f64>,
    /// Unscaled duration of the last render tick
    last_frame_delta: f64,
    /// Whether `SkeletonReady` has been emitted for the current definition
    ready_fired: bool,
    /// Hard resets of every reason
    hard_resets: u64,
    /// Report of the most recent tick
    report: TickReport,
}

impl fmt::Debug for TrackedSkeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedSkeleton")
            .field("avatar_id", &self.avatar_id)
            .field("graph", &self.graph)
            .field("buffer", &self.buffer)
            .field("current_delay", &self.clock.current_delay())
            .field("hard_resets", &self.hard_resets)
            .finish()
    }
}

impl TrackedSkeleton {
    pub fn new(avatar_id: AvatarId, config: PoseEngineConfig) -> Self {
        let clock = PlaybackClock::new(config.delay_recovery_rate, &config.tuning);
        Self {
            avatar_id,
            config,
            graph: None,
            staged: PoseArena::default(),
            buffer: JitterBuffer::new(),
            clock,
            interpolator: PoseInterpolator::new(),
            smoother: PoseSmoother::new(),
            arrival: ArrivalRateEstimator::new(),
            capture: Box::new(HumanPoseCapture),
            events: Vec::new(),
            manual_reset_at: None,
            last_frame_delta: 0.0,
            ready_fired: false,
            hard_resets: 0,
            report: TickReport::default(),
        }
    }

    /// Replace the pose capture used for buffer snapshots.
    pub fn with_capture(mut self, capture: impl PoseCapture + 'static) -> Self {
        self.capture = Box::new(capture);
        self
    }

    #[inline]
    pub fn avatar_id(&self) -> &AvatarId {
        &self.avatar_id
    }

    #[inline]
    pub fn config(&self) -> &PoseEngineConfig {
        &self.config
    }

    /// Build a new skeleton, replacing the current one.
    ///
    /// Clears the jitter buffer and re-arms the ready event. On error the
    /// previous skeleton stays in place.
    ///
    /// # Errors
    /// `DefinitionMismatch` for a malformed definition.
    #[instrument(
        level = "debug",
        name = "tracked_skeleton_define",
        skip(self, definition),
        fields(avatar = %self.avatar_id)
    )]
    pub fn define_skeleton(
        &mut self,
        definition: &SkeletonDefinition,
    ) -> Result<Arc<RetargetDescriptor>, ContractError> {
        let graph = BoneGraph::build(definition)?;
        let descriptor = Arc::clone(graph.descriptor());

        self.staged = PoseArena::from_graph(&graph);
        self.events.push(PoseEvent::SkeletonDefined {
            descriptor: Arc::clone(&descriptor),
            head_height: graph.head_height(),
        });
        self.graph = Some(graph);

        self.buffer.hard_reset();
        self.clock.forget_last_received();
        self.interpolator.clear();
        self.smoother.reset();
        self.ready_fired = false;
        self.hard_resets = 0;

        Ok(descriptor)
    }

    /// Ingest one frame sample received at `realtime`.
    ///
    /// Stream anomalies (rewinds, gaps, delay overflow) are handled here and
    /// never surface as errors.
    ///
    /// # Errors
    /// `FrameMismatch` when the sample arrays differ in length.
    #[instrument(
        level = "trace",
        name = "tracked_skeleton_push",
        skip(self, sample),
        fields(avatar = %self.avatar_id, frame_id = sample.frame_id, timestamp = sample.timestamp)
    )]
    pub fn push_frame(
        &mut self,
        mut sample: FrameSample,
        realtime: f64,
    ) -> Result<PushOutcome, ContractError> {
        sample.validate()?;
        self.arrival.record_arrival();
        metrics::counter!("pose_frames_ingested_total", "avatar" => self.avatar_id.to_string())
            .increment(1);

        apply_mirroring(&mut sample, self.config.mirroring);

        if self.graph.is_none() {
            trace!("no skeleton defined, dropping frame");
            return Ok(PushOutcome::NoSkeleton);
        }

        let reset = self.reset_reason(&sample, realtime);
        if let Some(reason) = reset {
            self.hard_reset(reason, sample.timestamp, realtime);
        }

        let Some(graph) = self.graph.as_ref() else {
            return Ok(PushOutcome::NoSkeleton);
        };
        self.staged.stage_frame(graph, &sample);

        let capture = &self.capture;
        let staged = &self.staged;
        let slot = self
            .buffer
            .snapshot(sample.frame_id, sample.timestamp, || capture.capture(graph, staged));
        if reset.is_some() {
            self.interpolator.anchor(slot);
        }

        let virtual_now = self.clock.advance(
            sample.frame_id,
            sample.timestamp,
            realtime,
            self.last_frame_delta,
        );
        metrics::histogram!("pose_clock_delay_ms").record(self.clock.current_delay() * 1000.0);

        Ok(PushOutcome::Buffered {
            slot,
            reset,
            virtual_now,
        })
    }

    /// Force a hard reset of the jitter buffer.
    ///
    /// Every frame received within the debounce window re-anchors the stream.
    pub fn reset_buffer(&mut self, realtime: f64) {
        debug!(avatar = %self.avatar_id, "manual buffer reset");
        self.buffer.hard_reset();
        self.clock.forget_last_received();
        self.interpolator.clear();
        self.manual_reset_at = Some(realtime);
        self.count_reset(ResetReason::ManualReset);
    }

    /// Advance one render tick.
    ///
    /// `delta` is the unscaled tick duration, `realtime` the receiver clock.
    /// Returns the pose to hand to the rendering backend, `None` while the
    /// buffer is empty.
    #[instrument(
        level = "trace",
        name = "tracked_skeleton_tick",
        skip(self),
        fields(avatar = %self.avatar_id)
    )]
    pub fn tick(&mut self, delta: f64, realtime: f64) -> Option<HumanPose> {
        self.last_frame_delta = delta.max(0.0);
        self.report.arrival_rate = self.arrival.tick(realtime);
        self.report.current_delay = self.clock.current_delay();
        self.report.hard_resets = self.hard_resets;
        self.report.emitted = false;

        if !self.buffer.is_populated() {
            return None;
        }

        let virtual_now = self.clock.virtual_now(realtime);
        self.report.virtual_now = virtual_now;

        let blended = self.interpolator.render(&self.buffer, virtual_now)?;
        self.report.blend_factor = blended.blend_factor;
        self.report.last_slot = blended.last_slot;
        self.report.next_slot = blended.next_slot;

        let pose = self.smoother.apply(
            blended.pose,
            delta,
            self.config.target_fps,
            self.config.smoothing_factor,
        );
        self.report.emitted = true;

        if !self.ready_fired {
            self.ready_fired = true;
            debug!(avatar = %self.avatar_id, "skeleton ready");
            self.events.push(PoseEvent::SkeletonReady);
        }

        Some(pose)
    }

    /// Take the events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<PoseEvent> {
        std::mem::take(&mut self.events)
    }

    /// Diagnostics of the last tick.
    #[inline]
    pub fn report(&self) -> &TickReport {
        &self.report
    }

    #[inline]
    pub fn graph(&self) -> Option<&BoneGraph> {
        self.graph.as_ref()
    }

    pub fn descriptor(&self) -> Option<&Arc<RetargetDescriptor>> {
        self.graph.as_ref().map(BoneGraph::descriptor)
    }

    /// Head height of the current skeleton, 0 before any definition.
    pub fn head_height(&self) -> f32 {
        self.graph.as_ref().map_or(0.0, BoneGraph::head_height)
    }

    /// Frames per second over the last second, as of the last tick.
    #[inline]
    pub fn arrival_rate(&self) -> usize {
        self.arrival.rate()
    }

    #[inline]
    pub fn current_delay(&self) -> f64 {
        self.clock.current_delay()
    }

    #[inline]
    pub fn buffer(&self) -> &JitterBuffer<HumanPose> {
        &self.buffer
    }

    #[inline]
    pub fn hard_resets(&self) -> u64 {
        self.hard_resets
    }

    fn reset_reason(&self, sample: &FrameSample, realtime: f64) -> Option<ResetReason> {
        let Some(last) = self.clock.last_received() else {
            return Some(ResetReason::FirstSample);
        };
        if self
            .manual_reset_at
            .is_some_and(|at| realtime - at < self.config.tuning.reset_debounce_s)
        {
            return Some(ResetReason::ManualReset);
        }
        if sample.is_file_playback() && last.frame_id != FILE_PLAYBACK_FRAME_ID {
            return Some(ResetReason::FilePlaybackStarted);
        }
        if sample.frame_id < last.frame_id && sample.timestamp < last.timestamp {
            return Some(ResetReason::StreamRewound);
        }
        None
    }

    fn hard_reset(&mut self, reason: ResetReason, timestamp: f64, realtime: f64) {
        debug!(avatar = %self.avatar_id, %reason, timestamp, "jitter buffer hard reset");
        self.buffer.hard_reset();
        self.clock.restart(timestamp, realtime);
        self.interpolator.clear();
        self.count_reset(reason);
    }

    fn count_reset(&mut self, reason: ResetReason) {
        self.hard_resets += 1;
        metrics::counter!(
            "pose_buffer_hard_resets_total",
            "avatar" => self.avatar_id.to_string(),
            "reason" => reason.as_str()
        )
        .increment(1);
        self.events.push(PoseEvent::BufferReset { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{reference_frame, reference_skeleton};
    use approx::assert_relative_eq;

    const TICK: f64 = 1.0 / 60.0;

    fn tracked(config: PoseEngineConfig) -> TrackedSkeleton {
        let mut skeleton = TrackedSkeleton::new("performer".into(), config);
        skeleton.define_skeleton(&reference_skeleton()).unwrap();
        skeleton
    }

    fn buffered(outcome: PushOutcome) -> (usize, Option<ResetReason>) {
        match outcome {
            PushOutcome::Buffered { slot, reset, .. } => (slot, reset),
            PushOutcome::NoSkeleton => panic!("frame was not buffered"),
        }
    }

    #[test]
    fn test_define_emits_descriptor_and_head_height() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        let events = skeleton.drain_events();

        assert_eq!(events.len(), 1);
        match &events[0] {
            PoseEvent::SkeletonDefined {
                descriptor,
                head_height,
            } => {
                assert_eq!(descriptor.parent_of("head"), Some("neck_2"));
                assert_relative_eq!(*head_height, 1.73, epsilon = 1e-5);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(skeleton.drain_events().is_empty());
    }

    #[test]
    fn test_malformed_definition_keeps_previous_skeleton() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        let mut bad = reference_skeleton();
        bad.rotations.pop();

        assert!(skeleton.define_skeleton(&bad).is_err());
        assert_eq!(skeleton.graph().unwrap().len(), 27);
    }

    #[test]
    fn test_frames_before_definition_are_dropped() {
        let mut skeleton = TrackedSkeleton::new("a".into(), PoseEngineConfig::default());
        let outcome = skeleton.push_frame(reference_frame(1, 0.0, 0.0), 0.0).unwrap();
        assert_eq!(outcome, PushOutcome::NoSkeleton);
        assert!(skeleton.tick(TICK, 0.0).is_none());
    }

    #[test]
    fn test_mismatched_frame_is_an_error() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        let mut frame = reference_frame(1, 0.0, 0.0);
        frame.positions.pop();
        assert!(matches!(
            skeleton.push_frame(frame, 0.0),
            Err(ContractError::FrameMismatch { frame_id: 1, .. })
        ));
    }

    #[test]
    fn test_first_sample_resets_then_steady_stream_does_not() {
        let mut skeleton = tracked(PoseEngineConfig::default());

        let (_, reset) = buffered(skeleton.push_frame(reference_frame(1, 0.0, 0.0), 0.0).unwrap());
        assert_eq!(reset, Some(ResetReason::FirstSample));

        for id in 2..10 {
            let t = id as f64 * 0.02;
            let (slot, reset) =
                buffered(skeleton.push_frame(reference_frame(id, t, 0.0), t).unwrap());
            assert_eq!(slot, id as usize);
            assert_eq!(reset, None);
        }
        assert_eq!(skeleton.hard_resets(), 1);
    }

    #[test]
    fn test_rewound_stream_resets() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        skeleton.push_frame(reference_frame(50, 1.0, 0.0), 0.0).unwrap();
        skeleton.push_frame(reference_frame(51, 1.02, 0.0), 0.02).unwrap();

        let (_, reset) = buffered(skeleton.push_frame(reference_frame(3, 0.06, 0.0), 0.04).unwrap());
        assert_eq!(reset, Some(ResetReason::StreamRewound));

        // only the id went back: not a rewind
        let (_, reset) = buffered(skeleton.push_frame(reference_frame(2, 0.2, 0.0), 0.06).unwrap());
        assert_eq!(reset, None);
    }

    #[test]
    fn test_file_playback_after_live_stream_resets() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        skeleton.push_frame(reference_frame(10, 0.2, 0.0), 0.0).unwrap();

        let (slot, reset) =
            buffered(skeleton.push_frame(reference_frame(-1, 0.0, 0.0), 0.02).unwrap());
        assert_eq!(reset, Some(ResetReason::FilePlaybackStarted));
        assert_eq!(slot, 1);

        let (slot, reset) =
            buffered(skeleton.push_frame(reference_frame(-1, 0.02, 0.0), 0.04).unwrap());
        assert_eq!(reset, None);
        assert_eq!(slot, 2);
        assert_eq!(skeleton.current_delay(), 0.0);
    }

    #[test]
    fn test_manual_reset_debounce_window() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        skeleton.push_frame(reference_frame(1, 0.0, 0.0), 0.0).unwrap();
        skeleton.reset_buffer(1.0);
        assert!(!skeleton.buffer().is_populated());

        skeleton.push_frame(reference_frame(2, 0.02, 0.0), 1.1).unwrap();
        let (_, reset) = buffered(skeleton.push_frame(reference_frame(3, 0.04, 0.0), 3.0).unwrap());
        assert_eq!(reset, Some(ResetReason::ManualReset));

        let (_, reset) = buffered(skeleton.push_frame(reference_frame(4, 0.06, 0.0), 6.5).unwrap());
        assert_eq!(reset, None);
    }

    #[test]
    fn test_ready_fires_once_per_definition() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        skeleton.drain_events();

        skeleton.push_frame(reference_frame(1, 0.0, 0.0), 0.0).unwrap();
        skeleton.push_frame(reference_frame(2, 0.02, 0.0), 0.02).unwrap();
        for i in 1..5 {
            assert!(skeleton.tick(TICK, 0.02 + i as f64 * TICK).is_some());
        }
        let ready = |events: &[PoseEvent]| {
            events
                .iter()
                .filter(|e| matches!(e, PoseEvent::SkeletonReady))
                .count()
        };
        assert_eq!(ready(&skeleton.drain_events()), 1);

        skeleton.define_skeleton(&reference_skeleton()).unwrap();
        skeleton.push_frame(reference_frame(3, 0.04, 0.0), 0.2).unwrap();
        skeleton.tick(TICK, 0.21);
        assert_eq!(ready(&skeleton.drain_events()), 1);
    }

    #[test]
    fn test_tick_interpolates_between_frames() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        skeleton.push_frame(reference_frame(1, 0.0, 0.0), 0.0).unwrap();
        skeleton.push_frame(reference_frame(2, 0.02, 1.0), 0.0).unwrap();

        // second frame observed 20 ms of delay: vnow = realtime - 0.02
        let pose = skeleton.tick(TICK, 0.03).unwrap();
        assert_relative_eq!(skeleton.report().blend_factor, 0.5, epsilon = 1e-9);
        // hips x is negated on import
        assert_relative_eq!(pose.body_position[0], -0.5, epsilon = 1e-6);
        assert_eq!(skeleton.report().last_slot, 1);
        assert_eq!(skeleton.report().next_slot, 2);
    }

    #[test]
    fn test_mirroring_config_mirrors_frames() {
        let config = PoseEngineConfig {
            mirroring: true,
            ..Default::default()
        };
        let mut skeleton = tracked(config);
        skeleton.push_frame(reference_frame(1, 0.0, 0.25), 0.0).unwrap();
        let pose = skeleton.tick(TICK, 0.0).unwrap();
        // mirroring negates x, conversion negates it back
        assert_relative_eq!(pose.body_position[0], 0.25);
    }

    #[test]
    fn test_arrival_rate_reported_per_tick() {
        let mut skeleton = tracked(PoseEngineConfig::default());
        for id in 1..=3 {
            skeleton
                .push_frame(reference_frame(id, id as f64 * 0.02, 0.0), 0.0)
                .unwrap();
        }
        skeleton.tick(TICK, 0.0);
        assert_eq!(skeleton.report().arrival_rate, 3);
        assert_eq!(skeleton.arrival_rate(), 3);
    }
}
