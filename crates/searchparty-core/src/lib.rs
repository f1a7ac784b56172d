//! Searchparty Core - Live location sharing and search heatmaps
//!
//! This crate provides the core of the search-party engine:
//!
//! - **Model**: Party and participant ids, validated positions, capture timestamps, search areas
//! - **Source**: Permission-gated device position acquisition
//! - **Store**: Current-position upserts and append-only history (in-memory and SQLite)
//! - **Sampler**: Per-participant sampling loop (Idle→Acquiring→Writing→Idle, Stopped on teardown)
//! - **Presence**: Self / others partition of a party's current positions
//! - **Heatmap**: Decay-weighted overlay of live positions and recent history
//! - **Polling**: Periodic presence and heatmap refresh published over watch channels
//! - **Session**: Start/stop lifetime of a party view tying the periodic tasks together
//! - **Config**: Sampling cadence, polling cadence, decay and storage settings
//!
//! # Architecture
//!
//! Sampler, presence and heatmap run as independent cancellable tasks. They
//! share nothing in-process except the store, and need no locking on it:
//! - each Sampler only writes its own participant's keys
//! - history is append-only, keyed by `(participant, timestamp)`
//! - reads are snapshot reads that tolerate partial staleness
//!
//! ```text
//! PositionSource → Sampler → LocationStore → PresenceMerger  → PresenceView
//!                                          → HeatmapAggregator → HeatmapPoint*
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod heatmap;
pub mod identity;
pub mod model;
pub mod polling;
pub mod presence;
pub mod sampler;
pub mod session;
pub mod source;
pub mod store;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigError, DecayKind, HeatmapConfig, PresenceConfig, SamplingConfig, SearchConfig,
    StoreConfig,
};
pub use error::{AcquireError, Result, SearchError, StoreError};
pub use heatmap::{
    decay, DecayCurve, ExponentialDecay, HeatmapAggregator, HeatmapPoint, LinearDecay,
    PointCategory,
};
pub use identity::{IdentityProvider, StaticIdentity};
pub use model::{
    CurrentPosition, HistorySample, InMemoryPartyDirectory, ParticipantId, Party, PartyDirectory,
    PartyId, Position, SearchArea, Timestamp, MAX_CLOCK_SKEW_MS,
};
pub use polling::{HeatmapPoller, PollerHandle, PresencePoller};
pub use presence::{PresenceMerger, PresenceView};
pub use sampler::{SampleOutcome, Sampler, SamplerEvent, SamplerHandle, SamplerState};
pub use session::PartySession;
pub use source::{DevicePositionSource, LocationProvider, PermissionGate, PositionSource};
pub use store::{record_sample, InMemoryLocationStore, LocationStore};
#[cfg(feature = "sqlite")]
pub use store::{Schema, SqliteLocationStore};
pub use task::{spawn_periodic, CancelToken, TaskHandle};

/// Returns the version of searchparty-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[tokio::test]
    async fn test_empty_party_end_to_end() {
        let store: Arc<dyn LocationStore> = Arc::new(InMemoryLocationStore::new());
        let party = PartyId::from("empty");
        let me = ParticipantId::from("me");

        let view = PresenceMerger::new(Arc::clone(&store))
            .merge(&party, &me)
            .await
            .unwrap();
        let points = HeatmapAggregator::new(store)
            .aggregate(&party, &me, chrono::Duration::hours(1), Timestamp::from_millis(0))
            .await
            .unwrap();

        assert!(view.is_empty());
        assert!(points.is_empty());
    }
}
