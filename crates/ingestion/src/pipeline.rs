//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{AvatarId, MotionCallback, MotionMessage, MotionSource, SourcePacket};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};

/// Ingestion Pipeline
///
/// Owns the registered motion sources and funnels everything they emit into
/// one bounded queue. The render thread is the only consumer.
pub struct IngestionPipeline {
    /// One source per avatar
    sources: HashMap<AvatarId, Box<dyn MotionSource>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Data sender (shared by all sources)
    tx: Sender<SourcePacket>,

    /// Data receiver
    rx: Option<Receiver<SourcePacket>>,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig::new(channel_capacity))
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            sources: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
        }
    }

    /// Register the source driving an avatar
    ///
    /// # Errors
    /// `DuplicateSource` if the avatar already has one.
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source),
        fields(avatar = %source.avatar_id())
    )]
    pub fn register_source(&mut self, source: Box<dyn MotionSource>) -> Result<()> {
        let avatar_id = source.avatar_id().clone();
        if self.sources.contains_key(&avatar_id) {
            return Err(IngestionError::DuplicateSource { avatar_id });
        }
        debug!(avatar = %avatar_id, "registered motion source");
        self.sources.insert(avatar_id, source);
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting all motion sources");
        for source in self.sources.values() {
            self.start_source(source.as_ref());
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping all motion sources");
        for source in self.sources.values() {
            if source.is_listening() {
                source.stop();
            }
        }
    }

    /// Stop one source
    ///
    /// # Errors
    /// `UnknownSource` if nothing drives this avatar.
    pub fn stop_source(&self, avatar_id: &str) -> Result<()> {
        let source = self
            .sources
            .get(avatar_id)
            .ok_or_else(|| IngestionError::UnknownSource {
                avatar_id: AvatarId::new(avatar_id),
            })?;
        source.stop();
        Ok(())
    }

    fn start_source(&self, source: &dyn MotionSource) {
        if source.is_listening() {
            return;
        }
        debug!(avatar = %source.avatar_id(), "starting source");
        source.listen(Self::callback(self.tx.clone(), self.metrics.clone()));
    }

    fn callback(tx: Sender<SourcePacket>, metrics: Arc<IngestionMetrics>) -> MotionCallback {
        Arc::new(move |packet| {
            metrics.record_received();
            if let Err(e) = enqueue(&tx, packet, &metrics) {
                warn!(error = %e, "dropping packet");
            }
            metrics.update_queue_len(tx.len());
        })
    }

    /// Get data stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<SourcePacket>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Check if the avatar's source is listening
    pub fn is_source_listening(&self, avatar_id: &str) -> bool {
        self.sources
            .get(avatar_id)
            .map(|s| s.is_listening())
            .unwrap_or(false)
    }

    /// Whether any source is still producing
    pub fn any_listening(&self) -> bool {
        self.sources.values().any(|s| s.is_listening())
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Queue one packet.
///
/// Frames are dropped when the queue is full. Definitions wait for room:
/// losing one would leave the avatar without a skeleton.
fn enqueue(
    tx: &Sender<SourcePacket>,
    packet: SourcePacket,
    metrics: &IngestionMetrics,
) -> Result<()> {
    let avatar_id = packet.avatar_id.clone();
    let closed = || IngestionError::ChannelClosed {
        avatar_id: avatar_id.clone(),
    };

    match packet.message {
        MotionMessage::Skeleton(_) => {
            tx.send_blocking(packet).map_err(|_| closed())?;
            metrics.record_definition();
            trace!(avatar = %avatar_id, "definition queued");
        }
        MotionMessage::Frame(_) => match tx.try_send(packet) {
            Ok(()) => trace!(avatar = %avatar_id, "frame queued"),
            Err(TrySendError::Full(_)) => {
                metrics.record_dropped();
                metrics::counter!(
                    "ingestion_frames_dropped_total",
                    "avatar" => avatar_id.to_string()
                )
                .increment(1);
                trace!(avatar = %avatar_id, "frame dropped (queue full)");
            }
            Err(TrySendError::Closed(_)) => return Err(closed()),
        },
    }
    Ok(())
}
