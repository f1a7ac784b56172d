//! Coordinates, capture timestamps and the durable location records

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::ParticipantId;
use crate::error::{Result, SearchError};

/// How far a capture time may run ahead of the receiving clock
pub const MAX_CLOCK_SKEW_MS: i64 = 60_000;

/// Capture time in milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Wall-clock now
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }

    /// Milliseconds elapsed from `self` until `now` (negative if `self` is later)
    pub fn age_at(&self, now: Timestamp) -> i64 {
        now.0.saturating_sub(self.0)
    }

    pub fn saturating_sub(&self, span: Duration) -> Self {
        Self(self.0.saturating_sub(span.num_milliseconds()))
    }

    pub fn saturating_add_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Whether `self` lies more than `skew_ms` after `now`
    pub fn is_ahead_of(&self, now: Timestamp, skew_ms: i64) -> bool {
        self.age_at(now) < skew_ms.saturating_neg()
    }

    /// Accept a device capture time unless it is beyond the skew tolerance
    pub fn check_capture(self, now: Timestamp) -> Result<Self> {
        if self.is_ahead_of(now, MAX_CLOCK_SKEW_MS) {
            return Err(SearchError::FutureTimestamp {
                timestamp: self.0,
                now: now.0,
            });
        }
        Ok(self)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    /// Create a validated position
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SearchError::InvalidPosition(format!(
                "latitude {} out of range",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(SearchError::InvalidPosition(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Re-check a position that arrived through deserialization
    pub fn validated(self) -> Result<Self> {
        Self::new(self.latitude, self.longitude)
    }
}

/// Latest known location of one participant in one party.
///
/// Overwritten on every sample; history is the lossless trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPosition {
    pub participant: ParticipantId,
    pub position: Position,
    pub timestamp: Timestamp,
}

/// Immutable, append-only past location of one participant.
///
/// Keyed by `(participant, timestamp)` within a party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub participant: ParticipantId,
    pub position: Position,
    pub timestamp: Timestamp,
}
