//! Pose sinks standing in for the rendering backend.

use std::sync::{Arc, Mutex};

use contracts::{ContractError, HumanPose, PoseSink, SinkKind};
use tracing::{debug, trace};

/// Build the sink configured for an avatar.
pub fn sink_for(kind: SinkKind, avatar: &str) -> Box<dyn PoseSink> {
    match kind {
        SinkKind::Log => Box::new(LogSink::new(avatar)),
        SinkKind::Null => Box::new(NullSink),
    }
}

/// Logs poses through `tracing`.
///
/// Every pose is logged at trace level; one in `summary_every` also at debug.
#[derive(Debug)]
pub struct LogSink {
    name: String,
    applied: u64,
    summary_every: u64,
}

impl LogSink {
    pub fn new(avatar: &str) -> Self {
        Self {
            name: format!("log:{avatar}"),
            applied: 0,
            summary_every: 60,
        }
    }

    pub fn with_summary_every(mut self, every: u64) -> Self {
        self.summary_every = every.max(1);
        self
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }
}

impl PoseSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, pose: &HumanPose) -> Result<(), ContractError> {
        self.applied += 1;
        trace!(
            sink = %self.name,
            position = ?pose.body_position,
            rotation = ?pose.body_rotation,
            "pose"
        );
        if self.applied % self.summary_every == 0 {
            debug!(
                sink = %self.name,
                applied = self.applied,
                joints = pose.joint_count(),
                position = ?pose.body_position,
                "pose sink progress"
            );
        }
        Ok(())
    }
}

/// Discards poses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PoseSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    fn apply(&mut self, _pose: &HumanPose) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Keeps the latest pose behind a shared handle a renderer can poll.
#[derive(Debug, Clone, Default)]
pub struct LatestPoseSink {
    latest: Arc<Mutex<Option<HumanPose>>>,
}

impl LatestPoseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle sharing the same slot.
    pub fn handle(&self) -> Arc<Mutex<Option<HumanPose>>> {
        Arc::clone(&self.latest)
    }

    /// Copy of the latest pose, `None` before the first one or if the lock is
    /// poisoned.
    pub fn latest(&self) -> Option<HumanPose> {
        self.latest.lock().ok().and_then(|guard| guard.clone())
    }
}

impl PoseSink for LatestPoseSink {
    fn name(&self) -> &str {
        "latest"
    }

    fn apply(&mut self, pose: &HumanPose) -> Result<(), ContractError> {
        let mut guard = self
            .latest
            .lock()
            .map_err(|e| ContractError::sink_write("latest", e.to_string()))?;
        *guard = Some(pose.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_sink_shares_pose() {
        let mut sink = LatestPoseSink::new();
        let handle = sink.handle();
        assert!(sink.latest().is_none());

        let pose = HumanPose {
            body_position: [1.0, 2.0, 3.0],
            ..Default::default()
        };
        sink.apply(&pose).unwrap();
        assert_eq!(handle.lock().unwrap().as_ref(), Some(&pose));
    }

    #[test]
    fn test_log_sink_counts_poses() {
        let mut sink = LogSink::new("a").with_summary_every(2);
        for _ in 0..3 {
            sink.apply(&HumanPose::default()).unwrap();
        }
        assert_eq!(sink.applied(), 3);
        assert_eq!(sink.name(), "log:a");
    }

    #[test]
    fn test_sink_for_kind() {
        assert_eq!(sink_for(SinkKind::Null, "a").name(), "null");
        assert_eq!(sink_for(SinkKind::Log, "a").name(), "log:a");
    }
}
