//! Threshold tables with hysteresis selection
//!
//! A table is an ordered set of temperature bands, each with separate up
//! and down thresholds so the selection never oscillates at a single
//! boundary value. Selection moves the cursor at most one band per call;
//! a temperature that jumps several bands ahead is followed over the next
//! few cycles instead of instantly, which keeps speed transitions smooth.

use std::cmp::Ordering;

use crate::constants::default_thresholds;
use crate::data::TemperatureThreshold;

/// Ordered threshold bands plus the hysteresis cursor.
///
/// The thresholds themselves are immutable after construction; the cursor
/// is the only mutable state.
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    thresholds: Vec<TemperatureThreshold>,
    current: Option<usize>,
}

impl ThresholdTable {
    /// Build a table from configured thresholds, sorted ascending by up
    /// threshold. An empty input is replaced by the built-in default table
    /// so callers never operate on an empty table.
    pub fn new(mut thresholds: Vec<TemperatureThreshold>) -> Self {
        if thresholds.is_empty() {
            thresholds = default_thresholds::table();
        }
        thresholds.sort_by(|a, b| {
            a.up_threshold
                .partial_cmp(&b.up_threshold)
                .unwrap_or(Ordering::Equal)
        });
        Self {
            thresholds,
            current: None,
        }
    }

    /// Select the active band for `temperature`.
    ///
    /// The first call selects the lowest band; every call then moves the
    /// cursor at most one step. A down-step (temperature at or below the
    /// current band's down threshold) takes priority over an up-step
    /// (temperature at or above the next band's up threshold).
    pub fn auto_select(&mut self, temperature: f32) -> &TemperatureThreshold {
        let mut index = self.current.unwrap_or(0);

        if index > 0 && temperature <= self.thresholds[index].down_threshold {
            index -= 1;
        } else if index + 1 < self.thresholds.len()
            && temperature >= self.thresholds[index + 1].up_threshold
        {
            index += 1;
        }

        self.current = Some(index);
        &self.thresholds[index]
    }

    /// Currently selected band, if a selection has happened
    pub fn current(&self) -> Option<&TemperatureThreshold> {
        self.current.map(|i| &self.thresholds[i])
    }

    pub fn thresholds(&self) -> &[TemperatureThreshold] {
        &self.thresholds
    }

    /// Clear the cursor; the next `auto_select` starts from the lowest band
    pub fn reset(&mut self) {
        self.current = None;
    }
}
