//! Error types for searchparty-core

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for search-party operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Main error type for search-party operations
#[derive(Error, Debug)]
pub enum SearchError {
    /// Position acquisition errors
    #[error("Acquisition error: {0}")]
    Acquire(#[from] AcquireError),

    /// Location store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Coordinates outside the valid range
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    /// Decay window must be strictly positive
    #[error("Invalid decay window: {0}ms")]
    InvalidWindow(i64),

    /// Capture time too far ahead of the receiving clock
    #[error("Capture time {timestamp} is ahead of now ({now}) beyond the allowed skew")]
    FutureTimestamp { timestamp: i64, now: i64 },

    /// No authenticated participant is available
    #[error("No authenticated participant")]
    NotAuthenticated,

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Errors from a [`PositionSource`](crate::source::PositionSource)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    /// Location access has not been granted
    #[error("Location permission denied")]
    PermissionDenied,

    /// Sensor, provider or timeout fault
    #[error("Location acquisition failed: {0}")]
    AcquisitionFailed(String),
}

impl AcquireError {
    /// Transient faults are retried on the next cycle without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, AcquireError::AcquisitionFailed(_))
    }
}

/// Errors from a [`LocationStore`](crate::store::LocationStore)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write could not be persisted
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// The store could not be reached or read
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A history sample already exists under this key
    #[error("History sample already exists for {participant} at {timestamp}")]
    DuplicateSample { participant: String, timestamp: i64 },
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SearchError {
    fn from(err: rusqlite::Error) -> Self {
        SearchError::Store(StoreError::from(err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("serialization: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_error_transience() {
        assert!(!AcquireError::PermissionDenied.is_transient());
        assert!(AcquireError::AcquisitionFailed("timeout".into()).is_transient());
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::DuplicateSample {
            participant: "alice".into(),
            timestamp: 42,
        };
        assert!(err.to_string().contains("alice"));

        let wrapped: SearchError = StoreError::Unavailable("offline".into()).into();
        assert!(wrapped.to_string().contains("offline"));
    }
}
