//! Temperature source interface
//!
//! Supplies raw instantaneous readings; smoothing is the control loop's
//! responsibility. Implementations that share a bus with the EC must take
//! their platform's bus mutex internally for the duration of the read.

use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
pub trait TemperatureSource: Send + Sync {
    /// Prepare the source for reads. Idempotent.
    fn initialize(&self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Human-readable name for status displays, e.g. "CPU package"
    fn display_name(&self) -> String;

    /// Raw instantaneous temperature in degrees Celsius
    fn temperature(&self) -> Result<f32>;
}
