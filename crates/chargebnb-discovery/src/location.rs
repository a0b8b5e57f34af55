//! Device location capability.

use std::future::Future;

use chargebnb_core::Coordinate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The device has no location capability at all.
    #[error("location capability is not supported")]
    Unsupported,

    /// The capability exists but the user refused or the lookup failed.
    #[error("location request denied: {0}")]
    Denied(String),
}

/// One-shot position request against the device.
pub trait LocationProvider {
    fn current_position(&self) -> impl Future<Output = Result<Coordinate, LocationError>>;
}

/// A device that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        Ok(self.0)
    }
}

/// A device without a location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        Err(LocationError::Unsupported)
    }
}
