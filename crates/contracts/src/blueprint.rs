//! SessionBlueprint - Config Loader output
//!
//! Describes a playback session: engine defaults, the avatars to track, the
//! source driving each avatar and where its poses go.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{AvatarId, PoseEngineConfig};

/// Config schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Engine defaults shared by all avatars
    #[serde(default)]
    #[validate(nested)]
    pub engine: PoseEngineConfig,

    /// Render loop settings
    #[serde(default)]
    #[validate(nested)]
    pub render: RenderConfig,

    /// Tracked avatars
    pub avatars: Vec<AvatarConfig>,
}

impl SessionBlueprint {
    /// Engine config for an avatar: its override if present, else the
    /// session default.
    pub fn engine_for(&self, avatar: &AvatarConfig) -> PoseEngineConfig {
        avatar.engine.clone().unwrap_or_else(|| self.engine.clone())
    }
}

/// Render loop settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenderConfig {
    /// Render ticks per second
    #[serde(default = "default_fps")]
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub fps: f64,

    /// Capacity of the ingest queue between sources and the render loop
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
}

fn default_fps() -> f64 {
    60.0
}

fn default_queue_capacity() -> usize {
    512
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// One tracked avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub id: AvatarId,

    pub source: SourceConfig,

    #[serde(default)]
    pub sink: SinkKind,

    /// Overrides the session engine config
    #[serde(default)]
    pub engine: Option<PoseEngineConfig>,
}

/// Motion source driving an avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic capture stream
    Mock(MockSourceConfig),
}

/// Synthetic capture stream parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockSourceConfig {
    /// Nominal send rate (Hz)
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Maximum extra delivery delay per frame (ms)
    #[serde(default)]
    pub jitter_ms: f64,

    /// Stall once every N frames, 0 = never
    #[serde(default)]
    pub stall_every: u32,

    /// Stall length (ms)
    #[serde(default = "default_stall_ms")]
    pub stall_ms: f64,

    /// Send `-1` frame ids like a recorded-file player
    #[serde(default)]
    pub file_playback: bool,

    /// Mark samples as already mirrored by the sender
    #[serde(default)]
    pub mirrored_source: bool,

    /// Seed for the jitter generator
    #[serde(default)]
    pub seed: u64,
}

fn default_rate_hz() -> f64 {
    50.0
}

fn default_stall_ms() -> f64 {
    300.0
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            jitter_ms: 0.0,
            stall_every: 0,
            stall_ms: default_stall_ms(),
            file_playback: false,
            mirrored_source: false,
            seed: 0,
        }
    }
}

/// Where an avatar's poses are delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkKind {
    /// Log every pose through tracing
    #[default]
    Log,
    /// Discard poses
    Null,
}
