//! Hardware collaborator interfaces
//!
//! The control core never talks to hardware directly; it drives the two
//! traits defined here. Concrete drivers live with the platform front ends.

mod ec;
mod temperature;

pub use ec::{EcLockGuard, EmbeddedController};
pub use temperature::TemperatureSource;

#[cfg(test)]
pub use ec::MockEmbeddedController;
#[cfg(test)]
pub use temperature::MockTemperatureSource;
