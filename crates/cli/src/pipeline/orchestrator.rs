//! Session orchestrator - coordinates sources, ingestion and the render loop.
//!
//! Sources run on their own threads and only push into the ingestion queue.
//! Everything else (skeleton building, buffering, clocks, sinks) happens on
//! the render loop, which drains the queue at the start of every tick.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::Receiver;
use contracts::{PoseEvent, SessionBlueprint, SourceConfig, SourcePacket};
use ingestion::{IngestionPipeline, MockMotionSource};
use observability::{log_pose_event, record_ingestion_queue, record_tick_metrics};
use pose_engine::{sink_for, MonotonicClock, PoseSession};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Render ticks kept after every source finished, as a share of a second
const DRAIN_SECONDS: f64 = 0.5;

/// Session configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The session blueprint
    pub blueprint: SessionBlueprint,

    /// Maximum number of render ticks (None = unlimited)
    pub max_ticks: Option<u64>,

    /// Frames each source sends (None = unlimited)
    pub frames_per_source: Option<u64>,

    /// Session timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main session orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the session to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let (mut session, mut ingestion) = self.build()?;
        let rx = ingestion
            .take_receiver()
            .context("Failed to get ingestion receiver")?;

        let mut stats = PipelineStats {
            avatars: session.len(),
            ..Default::default()
        };

        info!(
            avatars = stats.avatars,
            fps = self.config.blueprint.render.fps,
            max_ticks = ?self.config.max_ticks,
            "Session running"
        );
        ingestion.start_all();

        let render = self.render_loop(&mut session, &ingestion, &rx, &mut stats);
        match self.config.timeout {
            Some(timeout) => {
                if tokio::time::timeout(timeout, render).await.is_err() {
                    warn!(timeout_secs = timeout.as_secs(), "Session timed out");
                }
            }
            None => render.await,
        }

        info!("Shutting down session...");
        ingestion.stop_all();

        stats.ingestion = ingestion.metrics().snapshot();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            tps = format!("{:.2}", stats.tps()),
            "Session shutdown complete"
        );

        Ok(stats)
    }

    /// Register one pose pipeline and one source per avatar
    fn build(&self) -> Result<(PoseSession<MonotonicClock>, IngestionPipeline)> {
        let blueprint = &self.config.blueprint;
        let mut session = PoseSession::new(MonotonicClock::new());
        let mut ingestion = IngestionPipeline::new(blueprint.render.queue_capacity);

        for avatar in &blueprint.avatars {
            session
                .add_avatar(
                    avatar.id.clone(),
                    blueprint.engine_for(avatar),
                    sink_for(avatar.sink, &avatar.id),
                )
                .map_err(|e| CliError::session_setup(e.to_string()))?;

            let SourceConfig::Mock(mock) = &avatar.source;
            let mut source = MockMotionSource::new(avatar.id.clone(), mock.clone());
            if let Some(frames) = self.config.frames_per_source {
                source = source.with_frame_limit(frames);
            }
            ingestion
                .register_source(Box::new(source))
                .map_err(|e| CliError::session_setup(e.to_string()))?;

            debug!(avatar = %avatar.id, sink = ?avatar.sink, "avatar registered");
        }

        Ok((session, ingestion))
    }

    async fn render_loop(
        &self,
        session: &mut PoseSession<MonotonicClock>,
        ingestion: &IngestionPipeline,
        rx: &Receiver<SourcePacket>,
        stats: &mut PipelineStats,
    ) {
        let fps = self.config.blueprint.render.fps;
        let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let drain_ticks = (fps * DRAIN_SECONDS).ceil() as u64;
        let mut exhausted_at: Option<u64> = None;

        loop {
            interval.tick().await;

            while let Ok(packet) = rx.try_recv() {
                stats.packets_received += 1;
                if let Err(e) = session.handle(packet) {
                    stats.packet_errors += 1;
                    warn!(error = %e, "Packet rejected");
                }
            }

            for tick in session.tick() {
                record_tick_metrics(&tick.avatar_id, &tick.report);
                stats.pose_metrics.update(&tick.avatar_id, &tick.report);
                if tick.report.emitted {
                    stats.poses_emitted += 1;
                }
            }

            for (avatar_id, event) in session.drain_events() {
                match event {
                    PoseEvent::SkeletonDefined { .. } => stats.skeletons_defined += 1,
                    PoseEvent::BufferReset { .. } => stats.buffer_resets += 1,
                    PoseEvent::SkeletonReady => {}
                }
                log_pose_event(&avatar_id, &event);
            }

            let snapshot = ingestion.metrics().snapshot();
            record_ingestion_queue(rx.len(), snapshot.packets_dropped);
            stats.ticks += 1;

            if let Some(max) = self.config.max_ticks {
                if stats.ticks >= max {
                    info!(ticks = stats.ticks, "Reached max ticks limit");
                    break;
                }
            }

            if exhausted_at.is_none() && !ingestion.any_listening() && rx.is_empty() {
                info!(ticks = stats.ticks, "All sources finished, draining playback");
                exhausted_at = Some(stats.ticks);
            }
            if exhausted_at.is_some_and(|at| stats.ticks >= at + drain_ticks) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AvatarConfig, MockSourceConfig, RenderConfig, SinkKind};

    fn blueprint() -> SessionBlueprint {
        SessionBlueprint {
            version: Default::default(),
            engine: Default::default(),
            render: RenderConfig {
                fps: 200.0,
                queue_capacity: 64,
            },
            avatars: vec![AvatarConfig {
                id: "performer".into(),
                source: SourceConfig::Mock(MockSourceConfig {
                    rate_hz: 100.0,
                    ..Default::default()
                }),
                sink: SinkKind::Null,
                engine: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_finite_run_drains_and_stops() {
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint: blueprint(),
            max_ticks: None,
            frames_per_source: Some(20),
            timeout: Some(Duration::from_secs(10)),
            metrics_port: None,
        });

        let stats = pipeline.run().await.unwrap();
        assert_eq!(stats.packets_received, 21);
        assert_eq!(stats.skeletons_defined, 1);
        assert_eq!(stats.packet_errors, 0);
        assert!(stats.poses_emitted > 0);
        assert_eq!(stats.ingestion.definitions, 1);
    }

    #[tokio::test]
    async fn test_max_ticks_limit() {
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint: blueprint(),
            max_ticks: Some(5),
            frames_per_source: None,
            timeout: Some(Duration::from_secs(10)),
            metrics_port: None,
        });

        let stats = pipeline.run().await.unwrap();
        assert_eq!(stats.ticks, 5);
    }
}
