//! Configuration helpers
//!
//! The core never loads or stores configuration files; front ends hand a
//! fully validated [`FanControlConfig`](crate::data::FanControlConfig) to
//! the control loop.

use crate::data::types::TemperatureThreshold;

/// Create the built-in default threshold table
///
/// Returns the same table as `constants::default_thresholds::table()`.
/// Prefer using the constant directly where possible.
pub fn create_default_thresholds() -> Vec<TemperatureThreshold> {
    crate::constants::default_thresholds::table()
}
