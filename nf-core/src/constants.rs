//! Constants and configuration defaults for Notefan
//!
//! Centralizes all magic numbers and configuration defaults.
//! This is the SINGLE SOURCE OF TRUTH for all configuration values.
//! Never use magic numbers in other files - add them here first.

/// Timing defaults and bounds
pub mod timing {
    /// Default interval between poll cycles
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

    /// Lower bound enforced on the configured poll interval
    pub const MIN_POLL_INTERVAL_MS: u64 = 100;

    /// Default window for the arithmetic-mean temperature filter
    pub const DEFAULT_AVERAGING_WINDOW_MS: u64 = 6000;

    /// Bounded acquire timeout for the EC hardware lock
    pub const EC_LOCK_TIMEOUT_MS: u64 = 200;
}

/// Control-loop behavior
pub mod control {
    /// Hysteresis offset below the critical temperature before the
    /// critical-mode latch clears
    pub const CRITICAL_HYSTERESIS_CELSIUS: f32 = 15.0;

    /// Well-known sentinel requesting threshold-table (auto) control.
    /// Any requested percentage outside 0-100 has the same meaning.
    pub const AUTO_FAN_SPEED: f32 = 101.0;

    /// Read attempts per cycle while a fan readback is outside its
    /// declared range
    pub const READBACK_ATTEMPTS: u32 = 3;

    /// Full reset passes performed on shutdown (individual EC writes may
    /// silently fail)
    pub const RESET_PASSES: u32 = 3;

    /// Consecutive skipped cycles before the warning is repeated
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;
}

/// Percentage range
pub mod percent {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 100.0;

    /// Tolerance for exact-match percentage comparisons
    pub const EPSILON: f32 = 0.001;
}

/// Built-in threshold table used whenever a fan's configured table is empty
pub mod default_thresholds {
    use crate::data::TemperatureThreshold;

    /// Six-point table covering idle through full speed
    pub fn table() -> Vec<TemperatureThreshold> {
        vec![
            TemperatureThreshold::new(0.0, 0.0, 0.0),
            TemperatureThreshold::new(60.0, 48.0, 10.0),
            TemperatureThreshold::new(63.0, 55.0, 20.0),
            TemperatureThreshold::new(66.0, 59.0, 50.0),
            TemperatureThreshold::new(68.0, 63.0, 70.0),
            TemperatureThreshold::new(71.0, 67.0, 100.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_ascending_and_consistent() {
        let table = default_thresholds::table();
        assert_eq!(table.len(), 6);
        for pair in table.windows(2) {
            assert!(pair[0].up_threshold < pair[1].up_threshold);
        }
        for threshold in &table {
            assert!(threshold.down_threshold <= threshold.up_threshold);
        }
        assert_eq!(table[0].fan_speed(), 0.0);
        assert_eq!(table[5].fan_speed(), 100.0);
    }
}
