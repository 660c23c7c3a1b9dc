//! Mock motion source
//!
//! Emits the reference humanoid definition followed by an animated frame
//! stream from a background thread, like a capture device would. Network
//! effects are simulated on the delivery schedule: seeded jitter, periodic
//! stalls that release a burst of late frames, `-1` frame ids for file
//! playback, and pre-mirrored samples.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{
    reference_frame, reference_skeleton, AvatarId, FrameSample, MockSourceConfig, MotionCallback,
    MotionSource, SourcePacket, FILE_PLAYBACK_FRAME_ID,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Torso bone the mock sways.
const SWAY_BONE: usize = 1;
/// Upper arm the mock waves.
const WAVE_BONE: usize = 12;

/// One frame and when it should reach the receiver.
#[derive(Debug, Clone)]
pub struct ScheduledFrame {
    pub sample: FrameSample,
    /// Offset from stream start
    pub deliver_at: Duration,
}

/// Deterministic frame schedule for a mock stream.
///
/// Sender timestamps advance at exactly `1 / rate_hz`. Delivery times get
/// the simulated network effects and never go backwards.
#[derive(Debug)]
pub struct MockSchedule {
    config: MockSourceConfig,
    rng: StdRng,
    index: u64,
    last_deliver: f64,
    stall_until: f64,
}

impl MockSchedule {
    pub fn new(config: MockSourceConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            index: 0,
            last_deliver: 0.0,
            stall_until: 0.0,
        }
    }

    /// Nominal send interval (seconds)
    #[inline]
    pub fn interval(&self) -> f64 {
        1.0 / self.config.rate_hz
    }

    fn frame_id(&self) -> i32 {
        if self.config.file_playback {
            FILE_PLAYBACK_FRAME_ID
        } else {
            // ids start at 1 and wrap inside the positive range
            (self.index % i32::MAX as u64) as i32 + 1
        }
    }
}

impl Iterator for MockSchedule {
    type Item = ScheduledFrame;

    fn next(&mut self) -> Option<Self::Item> {
        let sent_at = self.index as f64 * self.interval();

        let stall_every = u64::from(self.config.stall_every);
        if stall_every > 0 && self.index > 0 && self.index % stall_every == 0 {
            self.stall_until = sent_at + self.config.stall_ms / 1000.0;
        }

        let jitter = if self.config.jitter_ms > 0.0 {
            self.rng.random_range(0.0..self.config.jitter_ms) / 1000.0
        } else {
            0.0
        };

        let deliver = (sent_at + jitter)
            .max(self.stall_until)
            .max(self.last_deliver);
        self.last_deliver = deliver;

        let mut sample = animated_frame(self.frame_id(), sent_at);
        sample.is_mirrored = self.config.mirrored_source;
        self.index += 1;

        Some(ScheduledFrame {
            sample,
            deliver_at: Duration::from_secs_f64(deliver),
        })
    }
}

/// Reference pose with hips sway, torso twist and a waving arm.
fn animated_frame(frame_id: i32, t: f64) -> FrameSample {
    let hips_x = 0.1 * (TAU * 0.5 * t).sin();
    let mut sample = reference_frame(frame_id, t, hips_x as f32);

    let twist = 0.3 * (TAU * 0.25 * t).sin();
    let (s, c) = (twist / 2.0).sin_cos();
    sample.rotations[SWAY_BONE] = [0.0, s as f32, 0.0, c as f32];

    let wave = 0.6 * (TAU * 1.0 * t).sin();
    let (s, c) = (wave / 2.0).sin_cos();
    sample.rotations[WAVE_BONE] = [0.0, 0.0, s as f32, c as f32];

    sample
}

/// Mock motion source
///
/// Implements `MotionSource`: sends the skeleton definition once, then frames
/// on the schedule in a background thread, through the callback.
pub struct MockMotionSource {
    avatar_id: AvatarId,
    config: MockSourceConfig,
    frame_limit: Option<u64>,
    listening: Arc<AtomicBool>,
}

impl MockMotionSource {
    pub fn new(avatar_id: AvatarId, config: MockSourceConfig) -> Self {
        Self {
            avatar_id,
            config,
            frame_limit: None,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop after `frames` frames instead of streaming forever.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn config(&self) -> &MockSourceConfig {
        &self.config
    }
}

impl MotionSource for MockMotionSource {
    fn avatar_id(&self) -> &AvatarId {
        &self.avatar_id
    }

    fn listen(&self, callback: MotionCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let avatar_id = self.avatar_id.clone();
        let schedule = MockSchedule::new(self.config.clone());
        let limit = self.frame_limit.unwrap_or(u64::MAX);
        let listening = self.listening.clone();

        debug!(
            avatar = %avatar_id,
            rate_hz = self.config.rate_hz,
            jitter_ms = self.config.jitter_ms,
            stall_every = self.config.stall_every,
            "mock motion source started"
        );

        thread::spawn(move || {
            let start = Instant::now();
            callback(SourcePacket::skeleton(avatar_id.clone(), reference_skeleton()));

            let mut sent = 0u64;
            for scheduled in schedule {
                if sent >= limit || !listening.load(Ordering::Relaxed) {
                    break;
                }
                if let Some(wait) = scheduled.deliver_at.checked_sub(start.elapsed()) {
                    thread::sleep(wait);
                }
                if !listening.load(Ordering::Relaxed) {
                    break;
                }

                trace!(
                    avatar = %avatar_id,
                    frame_id = scheduled.sample.frame_id,
                    timestamp = scheduled.sample.timestamp,
                    "mock frame sent"
                );
                callback(SourcePacket::frame(avatar_id.clone(), scheduled.sample));
                sent += 1;
            }

            listening.store(false, Ordering::SeqCst);
            debug!(avatar = %avatar_id, frames = sent, "mock motion source stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
