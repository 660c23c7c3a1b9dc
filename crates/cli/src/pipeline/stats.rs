//! Session statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot;
use observability::PoseMetricsAggregator;

/// Statistics from a session run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Render ticks executed
    pub ticks: u64,

    /// Poses handed to sinks, summed over avatars
    pub poses_emitted: u64,

    /// Packets drained from the ingestion queue
    pub packets_received: u64,

    /// Packets the session rejected
    pub packet_errors: u64,

    /// Skeleton definitions applied
    pub skeletons_defined: u64,

    /// Jitter buffer hard resets
    pub buffer_resets: u64,

    /// Number of avatars in the session
    pub avatars: usize,

    /// Total duration of the run
    pub duration: Duration,

    /// Ingestion queue counters at shutdown
    pub ingestion: MetricsSnapshot,

    /// Per-avatar tick aggregates
    pub pose_metrics: PoseMetricsAggregator,
}

impl PipelineStats {
    /// Render ticks per second
    pub fn tps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received frames dropped on a full queue, as a percentage
    pub fn drop_rate(&self) -> f64 {
        let total = self.ingestion.packets_received;
        if total > 0 {
            (self.ingestion.packets_dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Render ticks: {} ({:.2}/s)", self.ticks, self.tps());
        println!("   ├─ Poses emitted: {}", self.poses_emitted);
        println!("   ├─ Packets received: {}", self.packets_received);
        println!("   ├─ Packets rejected: {}", self.packet_errors);
        println!("   ├─ Skeletons defined: {}", self.skeletons_defined);
        println!("   ├─ Buffer resets: {}", self.buffer_resets);
        println!("   └─ Avatars: {}", self.avatars);

        println!("\n📥 Ingestion");
        println!("   ├─ Received: {}", self.ingestion.packets_received);
        println!(
            "   └─ Dropped: {} ({:.2}%)",
            self.ingestion.packets_dropped,
            self.drop_rate()
        );

        println!("\n{}", self.pose_metrics.summary());
    }
}
