//! Notefan Core Library
//!
//! The control core for notebook embedded-controller fan control.
//!
//! # Features
//!
//! - **Threshold Tables**: temperature bands with up/down hysteresis and
//!   single-step transitions for smooth, oscillation-free speed changes
//! - **Speed Mapping**: percentage to raw register value conversion with
//!   per-fan overrides and inverted-range support
//! - **Critical Override**: a latched safety state forcing 100% fan speed
//!   above the critical temperature
//! - **Register Writes**: auxiliary EC configuration writes with bitwise
//!   compose modes and independent reset policies
//! - **Control Loop**: periodic polling with on-demand updates, bounded EC
//!   locking and lock-free snapshot reads
//!
//! # Module Structure
//!
//! - `data/` - configuration and published runtime types
//! - `engine/` - filtering, threshold selection, speed mapping, registers
//! - `hw/` - the embedded-controller and temperature-source interfaces
//! - `control` - the control-loop orchestrator
//!
//! # Example
//!
//! ```
//! use nf_core::{FanControlConfig, ThresholdTable};
//!
//! // an empty table falls back to the built-in six-point default
//! let mut table = ThresholdTable::new(Vec::new());
//! assert_eq!(table.auto_select(20.0).fan_speed(), 0.0);
//!
//! let config = FanControlConfig::default();
//! assert_eq!(config.critical_temperature, 70.0);
//! ```
//!
//! Front ends supply the hardware: implement [`EmbeddedController`] and
//! [`TemperatureSource`], hand both to [`FanControl::new`] together with a
//! validated configuration, then `start` the loop.

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod control;
pub mod error;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export primary types from data/
pub use data::{
    create_default_thresholds, FanConfiguration, FanControlConfig, FanControlSnapshot, FanStatus,
    OverrideDirection, RegisterWriteConfiguration, RegisterWriteMode, RegisterWriteOccasion,
    SpeedOverride, TemperatureThreshold,
};

// Re-export engine types
pub use engine::{Fan, RegisterWriteEngine, TemperatureFilter, ThresholdTable};

// Re-export hardware interfaces
pub use hw::{EcLockGuard, EmbeddedController, TemperatureSource};

// Re-export the control loop
pub use control::{snapshot_to_json, snapshot_to_json_compact, FanControl, LoopState};

// Re-export error types
pub use error::{NotefanError, Result};
