//! Telemetry snapshot and its change-tracking store
//!
//! The producer pushes a fresh [`Status`] as often as it likes; the store keeps
//! only the latest one and raises a dirty flag when the change is large enough
//! to be worth sending. The broadcaster consumes the flag once per tick.

pub mod store;

pub use store::{StatusStore, COORDINATE_THRESHOLD, ODOMETER_THRESHOLD};

/// One telemetry snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Status {
    /// Distance travelled
    pub odometer: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
}

impl Status {
    /// Create a new status
    pub fn new(odometer: f64, longitude: f64, latitude: f64) -> Self {
        Self {
            odometer,
            longitude,
            latitude,
        }
    }

    /// Whether `other` differs from `self` enough to warrant a broadcast
    ///
    /// True when the odometer moved by at least [`ODOMETER_THRESHOLD`] or either
    /// coordinate moved by at least [`COORDINATE_THRESHOLD`].
    pub fn differs_from(&self, other: &Status) -> bool {
        (other.odometer - self.odometer).abs() >= ODOMETER_THRESHOLD
            || (other.longitude - self.longitude).abs() >= COORDINATE_THRESHOLD
            || (other.latitude - self.latitude).abs() >= COORDINATE_THRESHOLD
    }
}
