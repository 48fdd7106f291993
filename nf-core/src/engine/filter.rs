//! Temperature filtering
//!
//! Instantaneous EC temperature readings are noisy; the control loop feeds
//! them through an arithmetic mean over a bounded time window so threshold
//! selection reacts to the trend, not to single-sample spikes.

use std::collections::VecDeque;

use crate::error::{NotefanError, Result};

/// Arithmetic-mean filter over the last N samples, where N is derived from
/// the averaging window and the poll interval.
///
/// While the history is still filling up the mean covers the samples seen
/// so far, so the first cycles track the raw reading closely.
#[derive(Debug)]
pub struct TemperatureFilter {
    history: VecDeque<f32>,
    capacity: usize,
}

impl TemperatureFilter {
    /// Create a filter for `averaging_window_ms` of history at one sample
    /// per `poll_interval_ms`.
    ///
    /// Both values must be positive; N = ceil(window / interval).
    pub fn new(averaging_window_ms: u64, poll_interval_ms: u64) -> Result<Self> {
        if averaging_window_ms == 0 {
            return Err(NotefanError::invalid_config(
                "temperature_averaging_ms",
                "must be positive",
            ));
        }
        if poll_interval_ms == 0 {
            return Err(NotefanError::invalid_config(
                "poll_interval_ms",
                "must be positive",
            ));
        }

        let capacity = averaging_window_ms.div_ceil(poll_interval_ms) as usize;
        Ok(Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Record a sample and return the mean of the history so far.
    pub fn filter(&mut self, sample: f32) -> f32 {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(sample);

        let sum: f32 = self.history.iter().sum();
        sum / self.history.len() as f32
    }

    /// Number of samples the full window holds
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard accumulated history
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_window() {
        assert!(TemperatureFilter::new(0, 1000).is_err());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        assert!(TemperatureFilter::new(6000, 0).is_err());
    }

    #[test]
    fn capacity_is_ceil_of_window_over_interval() {
        assert_eq!(TemperatureFilter::new(6000, 1000).unwrap().capacity(), 6);
        assert_eq!(TemperatureFilter::new(6500, 1000).unwrap().capacity(), 7);
        // window shorter than the interval still keeps one sample
        assert_eq!(TemperatureFilter::new(500, 1000).unwrap().capacity(), 1);
    }

    #[test]
    fn partial_history_averages_samples_seen_so_far() {
        let mut filter = TemperatureFilter::new(3000, 1000).unwrap();
        assert_eq!(filter.filter(60.0), 60.0);
        assert_eq!(filter.filter(30.0), 45.0);
        assert_eq!(filter.filter(30.0), 40.0);
    }

    #[test]
    fn full_window_drops_oldest_sample() {
        let mut filter = TemperatureFilter::new(3000, 1000).unwrap();
        filter.filter(10.0);
        filter.filter(20.0);
        filter.filter(30.0);
        // history now [20, 30, 40]
        assert_eq!(filter.filter(40.0), 30.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut filter = TemperatureFilter::new(3000, 1000).unwrap();
        filter.filter(90.0);
        filter.filter(90.0);
        filter.reset();
        assert_eq!(filter.filter(30.0), 30.0);
    }
}
