//! Acquisition of the local device's position
//!
//! A [`PositionSource`] is gated by a location permission that is re-checked
//! on every call, since the user can revoke it at any time.

mod device;

use async_trait::async_trait;

pub use device::{DevicePositionSource, LocationProvider, PermissionGate};

use crate::error::AcquireError;
use crate::model::Position;

/// Abstracts reading the current device coordinates
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Read the current position.
    ///
    /// Fails with [`AcquireError::PermissionDenied`] without touching the
    /// provider when location access is not granted.
    async fn acquire(&self) -> Result<Position, AcquireError>;

    /// Ask the user for location access; returns whether it is now granted
    async fn request_permission(&self) -> bool;
}
