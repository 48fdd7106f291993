//! Core data types for Notefan
//!
//! Defines the configuration structures handed to the control loop and the
//! runtime state it publishes back to readers.

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{percent, timing};

fn de_clamped_percent<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    Ok(value.clamp(percent::MIN, percent::MAX))
}

/// A single hysteresis band: the fan speed applied between its up and down
/// temperature thresholds.
///
/// `down_threshold <= up_threshold` is assumed by the selection algorithm;
/// enforcing it is a configuration-validation concern outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureThreshold {
    /// Temperature at or above which the next-higher band is entered
    pub up_threshold: f32,
    /// Temperature at or below which the next-lower band is entered
    pub down_threshold: f32,
    #[serde(deserialize_with = "de_clamped_percent")]
    fan_speed: f32,
}

impl TemperatureThreshold {
    pub fn new(up_threshold: f32, down_threshold: f32, fan_speed: f32) -> Self {
        Self {
            up_threshold,
            down_threshold,
            fan_speed: fan_speed.clamp(percent::MIN, percent::MAX),
        }
    }

    /// Fan speed for this band, always within 0-100
    pub fn fan_speed(&self) -> f32 {
        self.fan_speed
    }

    pub fn set_fan_speed(&mut self, fan_speed: f32) {
        self.fan_speed = fan_speed.clamp(percent::MIN, percent::MAX);
    }
}

/// Which conversion direction a [`SpeedOverride`] participates in.
///
/// Read and write applicability are independent predicates; an override may
/// apply to either direction or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideDirection {
    Write,
    Read,
    ReadWrite,
}

impl OverrideDirection {
    /// Does this override apply when converting percentage to raw value?
    pub fn applies_to_write(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// Does this override apply when converting raw value to percentage?
    pub fn applies_to_read(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }
}

impl Default for OverrideDirection {
    fn default() -> Self {
        Self::ReadWrite
    }
}

/// Exact-match mapping between a fan-speed percentage and a raw register
/// value, bypassing linear interpolation. No interpolation between
/// overrides takes place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedOverride {
    pub fan_speed: f32,
    pub raw_value: u16,
    #[serde(default)]
    pub direction: OverrideDirection,
}

/// How a register-write value is combined with the register's current
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterWriteMode {
    /// Write the value directly
    Set,
    /// Read the register, bitwise-AND with the value, write back
    And,
    /// Read the register, bitwise-OR with the value, write back
    Or,
}

impl Default for RegisterWriteMode {
    fn default() -> Self {
        Self::Set
    }
}

/// When a register-write configuration is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterWriteOccasion {
    /// Only while the control loop initializes
    OnInitialization,
    /// On initialization and on every poll cycle
    OnEveryWrite,
}

/// An auxiliary EC register write unrelated to fan speed, e.g. switching
/// the EC into manual fan control mode. Always byte I/O; the word-mode flag
/// governs fan speed registers only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterWriteConfiguration {
    pub register: u8,
    pub value: u8,
    #[serde(default)]
    pub write_mode: RegisterWriteMode,
    pub occasion: RegisterWriteOccasion,
    #[serde(default)]
    pub reset_required: bool,
    #[serde(default)]
    pub reset_value: u8,
    #[serde(default)]
    pub reset_write_mode: RegisterWriteMode,
    /// Free-text operator note describing what the write does
    #[serde(default)]
    pub description: String,
}

/// Static per-fan configuration.
///
/// Raw speed ranges may be inverted (`min_raw_value > max_raw_value`) for
/// controllers where a lower register value means a faster fan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanConfiguration {
    #[serde(default)]
    pub name: String,
    pub read_register: u8,
    pub write_register: u8,
    pub min_raw_value: u16,
    pub max_raw_value: u16,
    /// When set, readback validation and raw-to-percent conversion use the
    /// dedicated read range below instead of the write range
    #[serde(default)]
    pub independent_read_range: bool,
    #[serde(default)]
    pub min_raw_read_value: u16,
    #[serde(default)]
    pub max_raw_read_value: u16,
    #[serde(default)]
    pub reset_required: bool,
    #[serde(default)]
    pub reset_value: u16,
    #[serde(default)]
    pub thresholds: Vec<TemperatureThreshold>,
    #[serde(default)]
    pub overrides: Vec<SpeedOverride>,
}

impl Default for FanConfiguration {
    fn default() -> Self {
        Self {
            name: String::new(),
            read_register: 0,
            write_register: 0,
            min_raw_value: 0,
            max_raw_value: 255,
            independent_read_range: false,
            min_raw_read_value: 0,
            max_raw_read_value: 0,
            reset_required: false,
            reset_value: 0,
            thresholds: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

/// Top-level configuration handed to the control loop.
///
/// The loop takes this by value, so it owns an independent copy and is
/// immune to later mutation of the caller's configuration. Validation and
/// persistence happen outside the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanControlConfig {
    #[serde(default)]
    pub name: String,
    pub poll_interval_ms: u64,
    pub critical_temperature: f32,
    #[serde(default = "default_averaging_window")]
    pub temperature_averaging_ms: u64,
    #[serde(default)]
    pub read_write_words: bool,
    pub fans: Vec<FanConfiguration>,
    #[serde(default)]
    pub register_writes: Vec<RegisterWriteConfiguration>,
}

fn default_averaging_window() -> u64 {
    timing::DEFAULT_AVERAGING_WINDOW_MS
}

impl Default for FanControlConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            poll_interval_ms: timing::DEFAULT_POLL_INTERVAL_MS,
            critical_temperature: 70.0,
            temperature_averaging_ms: timing::DEFAULT_AVERAGING_WINDOW_MS,
            read_write_words: false,
            fans: Vec::new(),
            register_writes: Vec::new(),
        }
    }
}

/// Published per-fan state. Immutable once placed in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FanStatus {
    pub name: String,
    /// Speed derived from the last readback
    pub current_percent: f32,
    /// Effective target after auto/critical resolution
    pub target_percent: f32,
    pub target_raw_value: u16,
    /// Last raw value read back, possibly outside the declared range
    pub raw_readback: u16,
    pub auto_control_enabled: bool,
    pub critical_mode_enabled: bool,
}

/// Immutable snapshot of the whole control loop, published once per
/// completed poll cycle. Readers receive a shared reference to the same
/// snapshot; a new cycle swaps in a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FanControlSnapshot {
    /// Filtered temperature the cycle was computed from
    pub temperature: f32,
    pub fans: Vec<FanStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_clamps_fan_speed_on_construction() {
        let t = TemperatureThreshold::new(50.0, 40.0, 150.0);
        assert_eq!(t.fan_speed(), 100.0);
        let t = TemperatureThreshold::new(50.0, 40.0, -3.0);
        assert_eq!(t.fan_speed(), 0.0);
    }

    #[test]
    fn threshold_clamps_fan_speed_on_assignment() {
        let mut t = TemperatureThreshold::new(50.0, 40.0, 10.0);
        t.set_fan_speed(400.0);
        assert_eq!(t.fan_speed(), 100.0);
    }

    #[test]
    fn threshold_clamps_fan_speed_on_deserialization() {
        let json = r#"{"up_threshold":60.0,"down_threshold":48.0,"fan_speed":180.0}"#;
        let t: TemperatureThreshold = serde_json::from_str(json).unwrap();
        assert_eq!(t.fan_speed(), 100.0);
    }

    #[test]
    fn override_direction_predicates_are_independent() {
        assert!(OverrideDirection::Write.applies_to_write());
        assert!(!OverrideDirection::Write.applies_to_read());
        assert!(OverrideDirection::Read.applies_to_read());
        assert!(!OverrideDirection::Read.applies_to_write());
        assert!(OverrideDirection::ReadWrite.applies_to_read());
        assert!(OverrideDirection::ReadWrite.applies_to_write());
    }

    #[test]
    fn fan_control_config_round_trips_through_json() {
        let config = FanControlConfig {
            name: "test-notebook".to_string(),
            poll_interval_ms: 1000,
            critical_temperature: 75.0,
            temperature_averaging_ms: 4000,
            read_write_words: false,
            fans: vec![FanConfiguration {
                name: "cpu fan".to_string(),
                read_register: 0x95,
                write_register: 0x94,
                max_raw_value: 200,
                thresholds: vec![TemperatureThreshold::new(60.0, 48.0, 10.0)],
                overrides: vec![SpeedOverride {
                    fan_speed: 100.0,
                    raw_value: 0xFF,
                    direction: OverrideDirection::Write,
                }],
                ..Default::default()
            }],
            register_writes: vec![RegisterWriteConfiguration {
                register: 0x93,
                value: 0x14,
                write_mode: RegisterWriteMode::Or,
                occasion: RegisterWriteOccasion::OnInitialization,
                reset_required: true,
                reset_value: 0x04,
                reset_write_mode: RegisterWriteMode::Set,
                description: "manual mode".to_string(),
            }],
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: FanControlConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn fan_control_config_defaults() {
        let config = FanControlConfig::default();
        assert_eq!(config.poll_interval_ms, timing::DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.critical_temperature, 70.0);
        assert!(!config.read_write_words);
        assert!(config.fans.is_empty());
    }
}
