//! # Integration Tests
//!
//! Cross-crate scenarios and end-to-end tests.
//!
//! Covers:
//! - Contract sanity checks
//! - Engine scenarios driven by a manual clock
//! - Mock source to pose sink end-to-end runs

#[cfg(test)]
mod contract_tests {
    use contracts::{
        bone_table, reference_skeleton, ConfigVersion, TickReport, BONE_NAMES, MAX_DELAY_TIME,
    };

    #[test]
    fn test_contracts_compile() {
        let _ = ConfigVersion::V1;
        assert_eq!(TickReport::default().hard_resets, 0);
        assert!(MAX_DELAY_TIME > 5.0);
    }

    #[test]
    fn test_bone_table_matches_reference_skeleton() {
        let def = reference_skeleton();
        assert_eq!(bone_table().len(), BONE_NAMES.len());
        for id in &def.bone_ids {
            assert!(bone_table().name(*id).is_some(), "bone {id} has no name");
        }
    }
}

#[cfg(test)]
mod skeleton_tests {
    use contracts::{reference_skeleton, SkeletonDefinition, REFERENCE_PARENTS};
    use pose_engine::{BoneGraph, SYNTHETIC_ROOT_NAME};

    #[test]
    fn test_every_bone_hangs_off_its_declared_parent() {
        let def = reference_skeleton();
        let graph = BoneGraph::build(&def).unwrap();
        let descriptor = graph.descriptor();

        for (key, node) in graph.bones() {
            let bone_id = node.bone_id.unwrap();
            let declared = REFERENCE_PARENTS[bone_id as usize];
            let parent = graph.node(node.parent.unwrap()).unwrap();

            if declared < 0 {
                assert!(graph.is_root_level(key));
                assert_eq!(parent.name, SYNTHETIC_ROOT_NAME);
            } else {
                assert_eq!(parent.bone_id, Some(declared));
            }
            assert_eq!(descriptor.parent_of(node.name), Some(parent.name));
        }
    }

    #[test]
    fn test_head_world_height() {
        let graph = BoneGraph::build(&reference_skeleton()).unwrap();
        let head = graph.key_of(10).unwrap();
        let world = graph.world_transform(head).unwrap();

        approx::assert_relative_eq!(world.translation.vector.y, 1.73, epsilon = 1e-5);
        approx::assert_relative_eq!(graph.head_height(), 1.73, epsilon = 1e-5);
    }

    #[test]
    fn test_orphans_and_self_parents_attach_to_root() {
        let identity = [0.0, 0.0, 0.0, 1.0];
        let def = SkeletonDefinition {
            bone_ids: vec![0, 1, 10, 5],
            parent_bone_ids: vec![-1, 0, 99, 5],
            rotations: vec![identity; 4],
            positions: vec![[0.0, 1.0, 0.0]; 4],
        };
        let graph = BoneGraph::build(&def).unwrap();

        assert!(graph.is_root_level(graph.key_of(0).unwrap()));
        assert!(!graph.is_root_level(graph.key_of(1).unwrap()));
        assert!(graph.is_root_level(graph.key_of(10).unwrap()));
        assert!(graph.is_root_level(graph.key_of(5).unwrap()));
    }
}

#[cfg(test)]
mod mirror_tests {
    use contracts::{bone_table, reference_frame};
    use pose_engine::{apply_mirroring, to_destination_position, to_destination_rotation};

    fn varied_frame() -> contracts::FrameSample {
        let mut sample = reference_frame(1, 0.0, 0.25);
        for (i, rotation) in sample.rotations.iter_mut().enumerate() {
            let a = 0.05 * i as f32;
            *rotation = [a.sin() * 0.3, a.cos() * 0.4, a.sin() * 0.5, 0.7];
        }
        sample
    }

    fn bits(sample: &contracts::FrameSample) -> (Vec<[u32; 4]>, Vec<[u32; 3]>) {
        (
            sample.rotations.iter().map(|r| r.map(f32::to_bits)).collect(),
            sample.positions.iter().map(|p| p.map(f32::to_bits)).collect(),
        )
    }

    #[test]
    fn test_mirroring_is_an_involution() {
        let original = varied_frame();
        let mut sample = original.clone();

        assert!(apply_mirroring(&mut sample, true));
        assert_ne!(bits(&sample), bits(&original));
        assert!(apply_mirroring(&mut sample, false));
        assert_eq!(bits(&sample), bits(&original));
    }

    #[test]
    fn test_mirroring_is_idempotent_per_mode() {
        let mut sample = varied_frame();
        apply_mirroring(&mut sample, true);
        let once = bits(&sample);

        assert!(!apply_mirroring(&mut sample, true));
        assert_eq!(bits(&sample), once);
    }

    #[test]
    fn test_mirroring_swaps_sides() {
        let original = varied_frame();
        let mut sample = original.clone();
        apply_mirroring(&mut sample, true);

        for (left, right) in bone_table().mirror_pair_ids() {
            let l = original.index_of(left).unwrap();
            let r = sample.index_of(right).unwrap();
            assert_eq!(sample.positions[r][0], -original.positions[l][0]);
            assert_eq!(sample.rotations[r][1], -original.rotations[l][1]);
            assert_eq!(sample.rotations[r][3], original.rotations[l][3]);
        }
    }

    #[test]
    fn test_coordinate_conversion_round_trip_is_bit_exact() {
        let values = [0.0f32, -0.0, 1.0e-40, f32::MIN_POSITIVE, -3.75, 123_456.79, f32::MAX];
        for &a in &values {
            for &b in &values {
                let p = [a, b, -a];
                let back = to_destination_position(to_destination_position(p));
                assert_eq!(back.map(f32::to_bits), p.map(f32::to_bits));

                let r = [a, b, -b, a];
                let back = to_destination_rotation(to_destination_rotation(r));
                assert_eq!(back.map(f32::to_bits), r.map(f32::to_bits));
            }
        }
    }
}

#[cfg(test)]
mod buffer_tests {
    use pose_engine::JitterBuffer;

    fn write(buffer: &mut JitterBuffer<i32>, frame_id: i32) -> usize {
        buffer.snapshot(frame_id, frame_id as f64 * 0.02, || frame_id)
    }

    #[test]
    fn test_gaps_are_skipped_in_order() {
        let mut buffer = JitterBuffer::new();
        for id in [1, 2, 4, 7] {
            write(&mut buffer, id);
        }
        assert_eq!(buffer.find_next_pose(1), 2);
        assert_eq!(buffer.find_next_pose(2), 4);
        assert_eq!(buffer.find_next_pose(4), 7);
        assert_eq!(buffer.find_next_pose(7), 7);
    }

    #[test]
    fn test_continuous_stream_wraps_the_ring() {
        let mut buffer = JitterBuffer::new();
        for id in 1..=300 {
            write(&mut buffer, id);
        }
        let slot = 300 % buffer.capacity();
        assert_eq!(buffer.last_write(), Some(slot));
        assert_eq!(buffer.find_next_pose(slot - 1), slot);
        assert_eq!(buffer.slot(slot).unwrap().pose, Some(300));
    }

    #[test]
    fn test_jump_past_a_lap_invalidates_stale_slots() {
        let mut buffer = JitterBuffer::new();
        for id in 1..=10 {
            write(&mut buffer, id);
        }
        // 260 lands in slot 4 and wraps past everything after slot 10
        let slot = write(&mut buffer, 260);
        assert_eq!(slot, 4);

        for stale in (11..buffer.capacity()).chain(0..4) {
            assert!(!buffer.slot(stale).unwrap().is_valid(), "slot {stale} survived");
        }
        // older ids 5..=10 are never newer than 260
        assert_eq!(buffer.find_next_pose(4), 4);
    }
}

#[cfg(test)]
mod playback_tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    use approx::assert_relative_eq;
    use contracts::{
        reference_frame, reference_skeleton, PoseEngineConfig, PoseEvent, ResetReason,
        MAX_DELAY_TIME,
    };
    use nalgebra::{UnitQuaternion, Vector3};
    use pose_engine::{rotation_quat, PushOutcome, TrackedSkeleton};

    const TICK: f64 = 1.0 / 60.0;

    fn tracked() -> TrackedSkeleton {
        let mut skeleton = TrackedSkeleton::new("performer".into(), PoseEngineConfig::default());
        skeleton.define_skeleton(&reference_skeleton()).unwrap();
        skeleton
    }

    fn reset_of(outcome: PushOutcome) -> Option<ResetReason> {
        match outcome {
            PushOutcome::Buffered { reset, .. } => reset,
            PushOutcome::NoSkeleton => panic!("frame was not buffered"),
        }
    }

    fn resets(events: &[PoseEvent]) -> Vec<ResetReason> {
        events
            .iter()
            .filter_map(|e| match e {
                PoseEvent::BufferReset { reason } => Some(*reason),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_halfway_slerp_then_hold() {
        let mut skeleton = tracked();
        let mut turned = reference_frame(2, 1.0, 0.0);
        let (s, c) = (FRAC_PI_4).sin_cos();
        turned.rotations[0] = [0.0, s, 0.0, c];

        skeleton.push_frame(reference_frame(1, 0.0, 0.0), 0.0).unwrap();
        skeleton.push_frame(turned, 0.0).unwrap();
        // both frames arrived at once: one second of delay
        assert_relative_eq!(skeleton.current_delay(), 1.0, epsilon = 1e-12);

        let start = UnitQuaternion::identity();
        // source yaw of +90 degrees reads as -90 in destination space
        let end = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -FRAC_PI_2);

        let pose = skeleton.tick(TICK, 1.5).unwrap();
        assert_relative_eq!(skeleton.report().virtual_now, 0.5, epsilon = 1e-12);
        assert_relative_eq!(skeleton.report().blend_factor, 0.5, epsilon = 1e-12);
        let halfway = rotation_quat(pose.body_rotation);
        assert!((halfway.angle_to(&start) - FRAC_PI_4).abs() < 1e-5);
        assert!((halfway.angle_to(&end) - FRAC_PI_4).abs() < 1e-5);

        for realtime in [2.0, 3.0, 20.0] {
            let pose = skeleton.tick(TICK, realtime).unwrap();
            assert_relative_eq!(skeleton.report().blend_factor, 1.0);
            assert!(rotation_quat(pose.body_rotation).angle_to(&end) < 1e-5);
        }
    }

    #[test]
    fn test_reset_then_frame_zero_starts_fresh() {
        let mut skeleton = tracked();
        for id in 0..=5 {
            let t = id as f64 * 0.02;
            skeleton.push_frame(reference_frame(id, t, 0.1 * id as f32), t).unwrap();
        }
        skeleton.reset_buffer(0.2);

        let outcome = skeleton.push_frame(reference_frame(0, 0.0, 0.7), 0.3).unwrap();
        assert_eq!(
            outcome,
            PushOutcome::Buffered {
                slot: 0,
                reset: Some(ResetReason::FirstSample),
                virtual_now: 0.0,
            }
        );
        for slot in 1..=5 {
            assert!(!skeleton.buffer().slot(slot).unwrap().is_valid());
        }

        let pose = skeleton.tick(TICK, 0.3 + TICK).unwrap();
        assert_relative_eq!(pose.body_position[0], -0.7);
        assert_eq!(
            resets(&skeleton.drain_events()),
            vec![
                ResetReason::FirstSample,
                ResetReason::ManualReset,
                ResetReason::FirstSample,
            ]
        );
    }

    #[test]
    fn test_delay_overflow_resets_once_and_stays_bounded() {
        let mut skeleton = tracked();
        skeleton.push_frame(reference_frame(1, 0.0, 0.0), 0.0).unwrap();

        // sender clock jumps six seconds ahead
        let outcome = skeleton.push_frame(reference_frame(2, 6.0, 0.0), 0.02).unwrap();
        assert_eq!(reset_of(outcome), None);
        assert_eq!(skeleton.current_delay(), 0.0);

        for id in 3..100 {
            let realtime = 0.02 * (id - 1) as f64;
            let timestamp = 6.0 + 0.02 * (id - 2) as f64;
            skeleton
                .push_frame(reference_frame(id, timestamp, 0.0), realtime)
                .unwrap();
            assert!(skeleton.current_delay() <= MAX_DELAY_TIME);
        }

        assert_eq!(skeleton.hard_resets(), 1);
        assert_eq!(resets(&skeleton.drain_events()), vec![ResetReason::FirstSample]);
    }

    #[test]
    fn test_stall_raises_delay_then_decays_without_overshoot() {
        let mut skeleton = tracked();
        let stall_release = 1.3;
        let mut delays = Vec::new();

        for id in 1..=120 {
            let timestamp = id as f64 * 0.02;
            let realtime = if (50..65).contains(&id) {
                stall_release
            } else {
                timestamp
            };
            skeleton
                .push_frame(reference_frame(id, timestamp, 0.0), realtime)
                .unwrap();
            skeleton.tick(TICK, realtime);
            delays.push(skeleton.current_delay());

            if id == 50 {
                // playback still trails the frame that ended the stall
                assert!(skeleton.report().virtual_now < timestamp);
            }
        }

        let steady = 0.04 - 2.0 * TICK;
        assert!(delays[..48].iter().all(|&d| d < 0.01));

        let peak = delays[49];
        assert!(peak > 0.28 && peak < 0.32, "peak {peak}");
        assert_eq!(delays.iter().copied().fold(0.0, f64::max), peak);

        for pair in delays[49..].windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "delay rose after the stall: {pair:?}");
        }
        assert!(delays[65..].iter().all(|&d| d >= steady - 1e-9));
        assert!(*delays.last().unwrap() < 0.02);
        assert_eq!(skeleton.hard_resets(), 1);
    }

    #[test]
    fn test_frame_id_lap_jump_keeps_emitting() {
        let mut skeleton = tracked();
        for id in 1..=10 {
            let t = id as f64 * 0.02;
            skeleton.push_frame(reference_frame(id, t, 0.0), t).unwrap();
        }
        assert!(skeleton.tick(0.0, 0.21).is_some());
        assert_eq!(skeleton.report().last_slot, 8);

        // id 265 lands one lap ahead in slot 9 and invalidates the slot in use
        skeleton
            .push_frame(reference_frame(265, 0.5, 0.0), 0.22)
            .unwrap();
        assert!(!skeleton.buffer().slot(8).unwrap().is_valid());

        assert!(skeleton.tick(0.0, 0.23).is_some());
        assert!(skeleton.report().emitted);
        assert_eq!(
            (skeleton.report().last_slot, skeleton.report().next_slot),
            (8, 9)
        );
    }

    #[test]
    fn test_arrival_rate_tracks_source() {
        let mut skeleton = tracked();
        // 50 Hz source, 100 Hz render
        for tick in 0..200 {
            let realtime = tick as f64 * 0.01;
            if tick % 2 == 0 {
                let id = tick / 2 + 1;
                skeleton
                    .push_frame(reference_frame(id, realtime, 0.0), realtime)
                    .unwrap();
            }
            skeleton.tick(0.01, realtime);
        }
        assert!((49..=51).contains(&skeleton.report().arrival_rate));
    }
}

#[cfg(test)]
mod session_tests {
    use approx::assert_relative_eq;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{reference_frame, reference_skeleton, PoseEvent, SourcePacket};
    use pose_engine::{LatestPoseSink, ManualClock, PoseSession};

    const SESSION_TOML: &str = r#"
[render]
fps = 60.0

[[avatars]]
id = "performer"
source = { kind = "mock" }

[[avatars]]
id = "reflection"
source = { kind = "mock", mirrored_source = false }
engine = { mirroring = true }
"#;

    #[test]
    fn test_blueprint_drives_per_avatar_engines() {
        let blueprint = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        let clock = ManualClock::new(0.0);
        let mut session = PoseSession::new(clock.clone());

        let mut sinks = Vec::new();
        for avatar in &blueprint.avatars {
            let sink = LatestPoseSink::new();
            session
                .add_avatar(avatar.id.clone(), blueprint.engine_for(avatar), Box::new(sink.clone()))
                .unwrap();
            sinks.push(sink);
        }
        assert_eq!(session.len(), 2);
        assert!(session.skeleton("reflection").unwrap().config().mirroring);

        for avatar in &blueprint.avatars {
            session
                .handle(SourcePacket::skeleton(avatar.id.clone(), reference_skeleton()))
                .unwrap();
            session
                .handle(SourcePacket::frame(avatar.id.clone(), reference_frame(1, 0.0, 0.5)))
                .unwrap();
        }
        clock.advance(1.0 / blueprint.render.fps);
        let ticks = session.tick();
        assert!(ticks.iter().all(|t| t.report.emitted));

        // mirroring flips X once more before the destination conversion
        assert_relative_eq!(sinks[0].latest().unwrap().body_position[0], -0.5);
        assert_relative_eq!(sinks[1].latest().unwrap().body_position[0], 0.5);

        let ready = session
            .drain_events()
            .into_iter()
            .filter(|(_, e)| *e == PoseEvent::SkeletonReady)
            .count();
        assert_eq!(ready, 2);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{MockSourceConfig, MotionMessage, PoseEngineConfig, PoseEvent};
    use ingestion::{IngestionPipeline, MockMotionSource};
    use observability::PoseMetricsAggregator;
    use pose_engine::{LatestPoseSink, ManualClock, PoseSession};

    /// End-to-end test: MockMotionSource -> IngestionPipeline -> PoseSession -> sink
    ///
    /// Checks the full data flow:
    /// 1. The mock source sends a skeleton definition, then frames
    /// 2. The ingestion queue hands packets to the render loop
    /// 3. The session emits poses to the sink every tick
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        const FRAMES: u64 = 30;

        let mut pipeline = IngestionPipeline::new(256);
        pipeline
            .register_source(Box::new(
                MockMotionSource::new(
                    "performer".into(),
                    MockSourceConfig {
                        rate_hz: 500.0,
                        jitter_ms: 1.0,
                        seed: 7,
                        ..Default::default()
                    },
                )
                .with_frame_limit(FRAMES),
            ))
            .unwrap();
        let rx = pipeline.take_receiver().unwrap();

        let clock = ManualClock::new(0.0);
        let mut session = PoseSession::new(clock.clone());
        let latest = LatestPoseSink::new();
        session
            .add_avatar("performer".into(), PoseEngineConfig::default(), Box::new(latest.clone()))
            .unwrap();
        let mut aggregator = PoseMetricsAggregator::new();

        pipeline.start_all();

        let mut frames = 0;
        let mut events = Vec::new();
        while frames < FRAMES {
            let packet = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for packets")
                .expect("ingestion queue closed");
            if matches!(packet.message, MotionMessage::Frame(_)) {
                frames += 1;
            }
            session.handle(packet).unwrap();

            clock.advance(1.0 / 60.0);
            for tick in session.tick() {
                aggregator.update(&tick.avatar_id, &tick.report);
            }
            events.extend(session.drain_events().into_iter().map(|(_, e)| e));
        }
        pipeline.stop_all();

        assert!(matches!(events[0], PoseEvent::SkeletonDefined { .. }));
        assert_eq!(
            events.iter().filter(|e| **e == PoseEvent::SkeletonReady).count(),
            1
        );

        let pose = latest.latest().expect("no pose reached the sink");
        assert_eq!(pose.joint_count(), 26);

        let summary = aggregator.summary();
        assert_eq!(summary.avatars.len(), 1);
        assert_eq!(summary.avatars[0].ticks, aggregator.total_ticks());
        assert!(summary.avatars[0].emitted > 0);
        assert_eq!(session.sink_errors("performer"), Some(0));
    }

    #[tokio::test]
    async fn test_e2e_file_playback_holds_zero_delay() {
        let mut pipeline = IngestionPipeline::new(256);
        pipeline
            .register_source(Box::new(
                MockMotionSource::new(
                    "recording".into(),
                    MockSourceConfig {
                        rate_hz: 500.0,
                        file_playback: true,
                        ..Default::default()
                    },
                )
                .with_frame_limit(20),
            ))
            .unwrap();
        let rx = pipeline.take_receiver().unwrap();

        let clock = ManualClock::new(0.0);
        let mut session = PoseSession::new(clock.clone());
        session
            .add_avatar(
                "recording".into(),
                PoseEngineConfig::default(),
                Box::new(LatestPoseSink::new()),
            )
            .unwrap();

        pipeline.start_all();

        let mut frames = 0;
        while frames < 20 {
            let packet = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for packets")
                .expect("ingestion queue closed");
            if matches!(packet.message, MotionMessage::Frame(_)) {
                frames += 1;
            }
            session.handle(packet).unwrap();
            clock.advance(0.05);
            for tick in session.tick() {
                assert_eq!(tick.report.current_delay, 0.0);
            }
        }
        pipeline.stop_all();

        let skeleton = session.skeleton("recording").unwrap();
        // only the first sample re-anchors a file playback stream
        assert_eq!(skeleton.hard_resets(), 1);
        assert!(skeleton.buffer().is_populated());
    }
}
