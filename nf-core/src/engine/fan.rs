//! Per-fan speed engine
//!
//! Converts between fan-speed percentages and the raw register values the
//! EC understands, honoring exact-match overrides, and resolves the
//! effective target each cycle: manual request, threshold-table auto
//! selection, or the latched critical override.

use tracing::{info, warn};

use crate::constants::{control, percent};
use crate::data::{FanConfiguration, FanStatus};
use crate::engine::ThresholdTable;
use crate::error::{NotefanError, Result};

/// One controlled fan: configuration, threshold table and runtime state.
pub struct Fan {
    config: FanConfiguration,
    table: ThresholdTable,
    critical_temperature: f32,
    requested_percent: f32,
    target_percent: f32,
    target_raw: u16,
    current_percent: f32,
    last_readback: u16,
    auto_control: bool,
    critical_mode: bool,
}

impl Fan {
    /// Build a fan engine from its configuration. An empty threshold table
    /// is replaced by the built-in default inside [`ThresholdTable::new`].
    pub fn new(config: FanConfiguration, critical_temperature: f32) -> Self {
        let table = ThresholdTable::new(config.thresholds.clone());
        Self {
            config,
            table,
            critical_temperature,
            requested_percent: control::AUTO_FAN_SPEED,
            target_percent: percent::MIN,
            target_raw: 0,
            current_percent: percent::MIN,
            last_readback: 0,
            auto_control: true,
            critical_mode: false,
        }
    }

    /// Record a manual speed request. Any value outside 0-100 (by
    /// convention [`control::AUTO_FAN_SPEED`]) delegates selection back to
    /// the threshold table.
    pub fn set_requested_percent(&mut self, percent: f32) {
        self.requested_percent = percent;
    }

    /// Recompute the target speed for the current temperature.
    pub fn update(&mut self, temperature: f32) -> Result<()> {
        self.update_critical_mode(temperature);

        self.auto_control = !(percent::MIN..=percent::MAX).contains(&self.requested_percent);
        let target = if self.auto_control {
            self.table.auto_select(temperature).fan_speed()
        } else {
            self.requested_percent
        };

        // Critical mode overrides both manual and auto selection.
        let effective = if self.critical_mode {
            percent::MAX
        } else {
            target
        };

        self.target_raw = self.percent_to_raw(effective)?;
        self.target_percent = effective;
        Ok(())
    }

    fn update_critical_mode(&mut self, temperature: f32) {
        if temperature > self.critical_temperature {
            if !self.critical_mode {
                warn!(
                    fan = %self.config.name,
                    temperature,
                    critical = self.critical_temperature,
                    "critical temperature exceeded; forcing full speed"
                );
            }
            self.critical_mode = true;
        } else if self.critical_mode
            && temperature < self.critical_temperature - control::CRITICAL_HYSTERESIS_CELSIUS
        {
            info!(fan = %self.config.name, temperature, "temperature back below critical band");
            self.critical_mode = false;
        }
    }

    /// Map a percentage to the raw register value.
    ///
    /// An exact-match override in the write direction wins; otherwise the
    /// value is interpolated linearly between the configured raw bounds
    /// (which may be inverted). Percentages outside 0-100 are a range
    /// error, never clamped.
    pub fn percent_to_raw(&self, value: f32) -> Result<u16> {
        if !(percent::MIN..=percent::MAX).contains(&value) {
            return Err(NotefanError::InvalidPercentage { value });
        }

        if let Some(ov) = self.config.overrides.iter().find(|o| {
            o.direction.applies_to_write() && (o.fan_speed - value).abs() < percent::EPSILON
        }) {
            return Ok(ov.raw_value);
        }

        let min = f32::from(self.config.min_raw_value);
        let max = f32::from(self.config.max_raw_value);
        Ok((min + (value / percent::MAX) * (max - min)).round() as u16)
    }

    /// Map a raw register value back to a percentage.
    ///
    /// An exact-match override in the read direction wins; otherwise the
    /// linear inverse over the read range (the write range unless an
    /// independent read range is declared). A zero-width read range maps
    /// everything to 0.
    pub fn raw_to_percent(&self, raw: u16) -> f32 {
        if let Some(ov) = self
            .config
            .overrides
            .iter()
            .find(|o| o.direction.applies_to_read() && o.raw_value == raw)
        {
            return ov.fan_speed;
        }

        let (min, max) = self.read_range();
        if min == max {
            return percent::MIN;
        }
        (f32::from(raw) - f32::from(min)) / (f32::from(max) - f32::from(min)) * percent::MAX
    }

    fn read_range(&self) -> (u16, u16) {
        if self.config.independent_read_range {
            (self.config.min_raw_read_value, self.config.max_raw_read_value)
        } else {
            (self.config.min_raw_value, self.config.max_raw_value)
        }
    }

    /// Is a readback within the declared read range? Inverted ranges are
    /// normalized before the containment check.
    pub fn is_raw_in_read_range(&self, raw: u16) -> bool {
        let (min, max) = self.read_range();
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        (lo..=hi).contains(&raw)
    }

    /// Record the raw value read back from the EC.
    pub fn note_readback(&mut self, raw: u16) {
        self.last_readback = raw;
        self.current_percent = self.raw_to_percent(raw);
    }

    /// Clear runtime state from a previous control-loop run. The manual
    /// speed request survives a restart.
    pub fn reset(&mut self) {
        self.table.reset();
        self.critical_mode = false;
        self.target_percent = percent::MIN;
        self.target_raw = 0;
        self.current_percent = percent::MIN;
        self.last_readback = 0;
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &FanConfiguration {
        &self.config
    }

    pub fn target_percent(&self) -> f32 {
        self.target_percent
    }

    pub fn target_raw_value(&self) -> u16 {
        self.target_raw
    }

    pub fn auto_control_enabled(&self) -> bool {
        self.auto_control
    }

    pub fn critical_mode_enabled(&self) -> bool {
        self.critical_mode
    }

    /// Immutable status record for snapshot publication
    pub fn status(&self) -> FanStatus {
        FanStatus {
            name: self.config.name.clone(),
            current_percent: self.current_percent,
            target_percent: self.target_percent,
            target_raw_value: self.target_raw,
            raw_readback: self.last_readback,
            auto_control_enabled: self.auto_control,
            critical_mode_enabled: self.critical_mode,
        }
    }
}
