//! PoseSink trait - outbound pose interface
//!
//! Stands in for the rendering/retargeting backend that receives the final
//! pose once per render tick.

use crate::{ContractError, HumanPose};

/// Pose consumer.
///
/// Called on the render thread; implementations must not block.
pub trait PoseSink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Apply one emitted pose
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn apply(&mut self, pose: &HumanPose) -> Result<(), ContractError>;
}
