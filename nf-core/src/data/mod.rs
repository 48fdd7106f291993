//! Data types and configuration modules
//!
//! Contains the configuration structures consumed by the control loop and
//! the runtime state it publishes.

mod config;
mod types;

pub use config::create_default_thresholds;
pub use types::{
    FanConfiguration, FanControlConfig, FanControlSnapshot, FanStatus, OverrideDirection,
    RegisterWriteConfiguration, RegisterWriteMode, RegisterWriteOccasion, SpeedOverride,
    TemperatureThreshold,
};
