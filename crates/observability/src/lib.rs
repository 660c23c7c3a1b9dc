//! # Observability
//!
//! Tracing and Prometheus metrics for the pose pipeline.
//!
//! ## Features
//!
//! - One subscriber setup for the CLI and embedders, with separate levels for
//!   the pose pipeline crates (per-frame spans live at `trace` there)
//! - Prometheus metrics export
//! - Per-tick pose metrics, session event logging and a run aggregator
//!
//! ## Usage Example
//!
//! ```ignore
//! let config = ObservabilityConfig::from_verbosity(1, false);
//! observability::init_with_config(config)?;
//!
//! for tick in session.tick() {
//!     observability::record_tick_metrics(&tick.avatar_id, &tick.report);
//! }
//! for (avatar, event) in session.drain_events() {
//!     observability::log_pose_event(&avatar, &event);
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use contracts::PoseEvent;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

// Re-exports
pub use crate::metrics::{
    record_ingestion_queue, record_tick_metrics, AvatarSummary, MetricsSummary,
    PoseMetricsAggregator, RunningStats, StatsSummary,
};

/// Crates whose hot paths (ingest, tick, queue) log per frame.
pub const PIPELINE_TARGETS: [&str; 2] = ["pose_engine", "ingestion"];

/// Observability configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Level for everything outside [`PIPELINE_TARGETS`]
    pub default_log_level: String,
    /// Level for the pipeline crates; `None` follows `default_log_level`
    pub pipeline_log_level: Option<String>,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
            pipeline_log_level: None,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// Levels for a `-q` / `-v` count.
    ///
    /// One `-v` shows hard resets and skeleton builds, two add per-frame
    /// spans from the pipeline crates, three turn everything to trace.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let (default, pipeline) = match (quiet, verbose) {
            (true, _) => ("warn", None),
            (false, 0) => ("info", None),
            (false, 1) => ("info", Some("debug")),
            (false, 2) => ("debug", Some("trace")),
            (false, _) => ("trace", None),
        };
        Self {
            default_log_level: default.to_string(),
            pipeline_log_level: pipeline.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.default_log_level.clone()];
        if let Some(level) = &self.pipeline_log_level {
            directives.extend(PIPELINE_TARGETS.iter().map(|t| format!("{t}={level}")));
        }
        directives.join(",")
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs
    #[default]
    Json,
    /// Human readable
    Pretty,
    /// Compact single line
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => anyhow::bail!("unknown log format: {other}"),
        }
    }
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

/// Install the tracing subscriber and, if a port is set, the Prometheus
/// recorder.
///
/// `RUST_LOG` overrides the configured levels.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    tracing_subscriber::registry()
        .with(fmt_layer(config.log_format))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    debug!(
        log_format = ?config.log_format,
        directives = %config.filter_directives(),
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus recorder
///
/// For callers that set up tracing themselves.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

/// Log one session event against its avatar.
///
/// Definitions and readiness are operator facing (`info`); buffer resets
/// happen on every stream restart and log at `debug`.
pub fn log_pose_event(avatar_id: &str, event: &PoseEvent) {
    match event {
        PoseEvent::SkeletonDefined {
            descriptor,
            head_height,
        } => info!(
            avatar = avatar_id,
            bones = descriptor.skeleton.len(),
            humanoid = descriptor.human.len(),
            head_height = format!("{head_height:.3}"),
            "Skeleton defined"
        ),
        PoseEvent::SkeletonReady => info!(avatar = avatar_id, "Skeleton ready"),
        PoseEvent::BufferReset { reason } => {
            debug!(avatar = avatar_id, %reason, "Buffer reset")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.filter_directives(), "info");
    }

    #[test]
    fn test_verbosity_raises_pipeline_levels_first() {
        assert_eq!(
            ObservabilityConfig::from_verbosity(1, false).filter_directives(),
            "info,pose_engine=debug,ingestion=debug"
        );
        assert_eq!(
            ObservabilityConfig::from_verbosity(2, false).filter_directives(),
            "debug,pose_engine=trace,ingestion=trace"
        );
        assert_eq!(ObservabilityConfig::from_verbosity(5, false).filter_directives(), "trace");
        assert_eq!(ObservabilityConfig::from_verbosity(2, true).filter_directives(), "warn");
    }

    #[test]
    fn test_with_format() {
        let config = ObservabilityConfig::from_verbosity(0, false).with_format(LogFormat::Compact);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.default_log_level, "info");
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_pose_event_without_subscriber() {
        let event = PoseEvent::BufferReset {
            reason: contracts::ResetReason::StreamRewound,
        };
        log_pose_event("performer", &event);
        log_pose_event("performer", &PoseEvent::SkeletonReady);
    }
}
