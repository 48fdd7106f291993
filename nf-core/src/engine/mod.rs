//! Fan control engine modules
//!
//! Pure control logic: temperature filtering, hysteresis threshold
//! selection, percent/raw speed mapping and auxiliary register writes.
//! Nothing here schedules anything; the control loop drives these.

mod fan;
mod filter;
mod registers;
mod thresholds;

pub use fan::Fan;
pub use filter::TemperatureFilter;
pub use registers::RegisterWriteEngine;
pub use thresholds::ThresholdTable;
