//! Position source built from a permission gate and a location provider

use std::time::Duration;

use async_trait::async_trait;

use super::PositionSource;
use crate::config::SamplingConfig;
use crate::error::AcquireError;
use crate::model::Position;

/// Device location permission (platform collaborator)
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn is_granted(&self) -> bool;

    /// Prompt the user; returns the resulting grant state
    async fn request(&self) -> bool;
}

/// Raw device location reading (platform collaborator)
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_fix(&self) -> Result<Position, String>;
}

/// [`PositionSource`] that checks the permission gate on every call and bounds
/// the provider read with a timeout
pub struct DevicePositionSource<G, P> {
    gate: G,
    provider: P,
    timeout: Duration,
}

impl<G: PermissionGate, P: LocationProvider> DevicePositionSource<G, P> {
    pub fn new(gate: G, provider: P, timeout: Duration) -> Self {
        Self {
            gate,
            provider,
            timeout,
        }
    }

    /// Bound reads by `sampling.acquire_timeout_ms`
    pub fn from_config(gate: G, provider: P, config: &SamplingConfig) -> Self {
        Self::new(gate, provider, config.acquire_timeout())
    }
}

#[async_trait]
impl<G: PermissionGate, P: LocationProvider> PositionSource for DevicePositionSource<G, P> {
    async fn acquire(&self) -> Result<Position, AcquireError> {
        if !self.gate.is_granted().await {
            return Err(AcquireError::PermissionDenied);
        }

        match tokio::time::timeout(self.timeout, self.provider.current_fix()).await {
            Ok(Ok(position)) => position
                .validated()
                .map_err(|e| AcquireError::AcquisitionFailed(e.to_string())),
            Ok(Err(reason)) => Err(AcquireError::AcquisitionFailed(reason)),
            Err(_) => Err(AcquireError::AcquisitionFailed(format!(
                "no fix within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn request_permission(&self) -> bool {
        self.gate.request().await
    }
}
