//! # Ingestion Pipeline
//!
//! Motion data ingestion module.
//!
//! Responsibilities:
//! - Register motion sources (mock capture streams, or anything implementing
//!   `MotionSource`)
//! - Funnel skeleton definitions and frames from every source into one queue
//! - Backpressure management and drop policy
//! - Hand packets to the render loop via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, MockMotionSource};
//! use contracts::MockSourceConfig;
//!
//! let mut pipeline = IngestionPipeline::new(512);
//! pipeline.register_source(Box::new(MockMotionSource::new(
//!     "performer".into(),
//!     MockSourceConfig::default(),
//! )))?;
//!
//! pipeline.start_all();
//! let rx = pipeline.take_receiver().unwrap();
//! // render thread
//! while let Ok(packet) = rx.try_recv() {
//!     session.handle(packet)?;
//! }
//! ```

mod config;
mod error;
mod mock;
mod pipeline;

// Re-exports
pub use config::{BackpressureConfig, IngestionMetrics, MetricsSnapshot};
pub use contracts::SourcePacket;
pub use error::{IngestionError, Result};
pub use mock::{MockMotionSource, MockSchedule, ScheduledFrame};
pub use pipeline::IngestionPipeline;
