//! Pose pipeline metrics
//!
//! Per-tick metrics from `TickReport` plus an in-memory aggregator for run
//! summaries.

use std::collections::BTreeMap;

use contracts::TickReport;
use metrics::{counter, gauge, histogram};

/// Record metrics for one avatar's render tick
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tick_metrics;
///
/// for tick in session.tick() {
///     record_tick_metrics(&tick.avatar_id, &tick.report);
/// }
/// ```
pub fn record_tick_metrics(avatar_id: &str, report: &TickReport) {
    let avatar = avatar_id.to_string();

    counter!("pose_ticks_total", "avatar" => avatar.clone()).increment(1);
    if !report.emitted {
        counter!("pose_ticks_idle_total", "avatar" => avatar.clone()).increment(1);
        return;
    }

    // seconds -> milliseconds
    gauge!("pose_playback_delay_ms", "avatar" => avatar.clone())
        .set(report.current_delay * 1000.0);
    gauge!("pose_arrival_rate_hz", "avatar" => avatar.clone()).set(report.arrival_rate as f64);
    gauge!("pose_virtual_time_s", "avatar" => avatar.clone()).set(report.virtual_now);
    histogram!("pose_blend_factor", "avatar" => avatar).record(report.blend_factor);
}

/// Record ingestion queue depth and totals
pub fn record_ingestion_queue(queue_len: usize, dropped_total: u64) {
    gauge!("ingestion_queue_depth").set(queue_len as f64);
    gauge!("ingestion_frames_dropped_current").set(dropped_total as f64);
}

/// Pose metrics aggregator
///
/// Aggregates tick reports in memory, one entry per avatar.
#[derive(Debug, Clone, Default)]
pub struct PoseMetricsAggregator {
    avatars: BTreeMap<String, AvatarAggregate>,
}

#[derive(Debug, Clone, Default)]
struct AvatarAggregate {
    ticks: u64,
    emitted: u64,
    hard_resets: u64,
    delay_ms: RunningStats,
    arrival_rate: RunningStats,
    blend_factor: RunningStats,
}

impl PoseMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick report in
    pub fn update(&mut self, avatar_id: &str, report: &TickReport) {
        let entry = self.avatars.entry(avatar_id.to_string()).or_default();
        entry.ticks += 1;
        // the engine counts resets per definition
        entry.hard_resets = entry.hard_resets.max(report.hard_resets);

        if report.emitted {
            entry.emitted += 1;
            entry.delay_ms.push(report.current_delay * 1000.0);
            entry.arrival_rate.push(report.arrival_rate as f64);
            entry.blend_factor.push(report.blend_factor);
        }
    }

    pub fn total_ticks(&self) -> u64 {
        self.avatars.values().map(|a| a.ticks).sum()
    }

    /// Generate summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            avatars: self
                .avatars
                .iter()
                .map(|(id, a)| AvatarSummary {
                    avatar_id: id.clone(),
                    ticks: a.ticks,
                    emitted: a.emitted,
                    emit_rate: if a.ticks > 0 {
                        a.emitted as f64 / a.ticks as f64 * 100.0
                    } else {
                        0.0
                    },
                    hard_resets: a.hard_resets,
                    delay_ms: StatsSummary::from(&a.delay_ms),
                    arrival_rate: StatsSummary::from(&a.arrival_rate),
                    blend_factor: StatsSummary::from(&a.blend_factor),
                })
                .collect(),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub avatars: Vec<AvatarSummary>,
}

/// Per-avatar summary
#[derive(Debug, Clone, Default)]
pub struct AvatarSummary {
    pub avatar_id: String,
    pub ticks: u64,
    pub emitted: u64,
    /// Percentage of ticks that produced a pose
    pub emit_rate: f64,
    pub hard_resets: u64,
    pub delay_ms: StatsSummary,
    pub arrival_rate: StatsSummary,
    pub blend_factor: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pose Metrics Summary ===")?;
        if self.avatars.is_empty() {
            return writeln!(f, "No ticks recorded");
        }
        for avatar in &self.avatars {
            writeln!(f, "[{}]", avatar.avatar_id)?;
            writeln!(
                f,
                "  Ticks: {} (emitted {}, {:.2}%)",
                avatar.ticks, avatar.emitted, avatar.emit_rate
            )?;
            writeln!(f, "  Hard resets: {}", avatar.hard_resets)?;
            writeln!(f, "  Playback delay (ms): {}", avatar.delay_ms)?;
            writeln!(f, "  Arrival rate (Hz): {}", avatar.arrival_rate)?;
            writeln!(f, "  Blend factor: {}", avatar.blend_factor)?;
        }
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
