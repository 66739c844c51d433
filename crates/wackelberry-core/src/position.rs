//! Position samples and the position source capability.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::PositionError;

/// One position sample: coordinates in degrees and a heading in degrees.
///
/// A heading of `0` means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees, positive north
    pub latitude: f64,
    /// Longitude in degrees, positive east
    pub longitude: f64,
    /// Direction of travel in degrees (1-360), 0 if unknown
    pub heading: u16,
}

impl Position {
    /// Create a sample.
    pub const fn new(latitude: f64, longitude: f64, heading: u16) -> Self {
        Self { latitude, longitude, heading }
    }

    /// Returns true if every component equals `other`'s.
    ///
    /// This is the debounce test of a live share: an identical sample is
    /// never republished.
    pub fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

/// Produces position samples on demand.
///
/// Implementations may fail or have no fix; live shares substitute a
/// configured fallback position in that case.
pub trait PositionSource: Send + Sync + 'static {
    /// Take one sample.
    fn sample(&self) -> impl Future<Output = Result<Position, PositionError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_as_is_componentwise() {
        let a = Position::new(1.0, 2.0, 90);

        assert!(a.same_as(&Position::new(1.0, 2.0, 90)));
        assert!(!a.same_as(&Position::new(1.0, 2.0, 91)));
        assert!(!a.same_as(&Position::new(1.000_001, 2.0, 90)));
        assert!(!a.same_as(&Position::new(1.0, 2.000_001, 90)));
    }
}
