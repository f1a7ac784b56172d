//! Persistence of current positions and position history
//!
//! The store owns two record kinds per party:
//!
//! - **current position**: one per participant, upserted on every sample
//!   (latest write wins, intentionally lossy)
//! - **history**: append-only samples keyed by `(participant, timestamp)`,
//!   never overwritten or deleted by the core
//!
//! Every write is keyed to a single owning participant, so concurrent writers
//! from the same party never contend and no locking is imposed on the store.

mod memory;
#[cfg(feature = "sqlite")]
mod schema;
#[cfg(feature = "sqlite")]
mod sqlite;

use async_trait::async_trait;

pub use memory::InMemoryLocationStore;
#[cfg(feature = "sqlite")]
pub use schema::{Schema, SCHEMA_VERSION};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLocationStore;

use crate::error::StoreError;
use crate::model::{CurrentPosition, HistorySample, ParticipantId, PartyId, Position, Timestamp};

/// Trait for location storage backends
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Upsert the participant's current position, replacing any prior value
    async fn put_current(
        &self,
        party: &PartyId,
        participant: &ParticipantId,
        position: Position,
        timestamp: Timestamp,
    ) -> Result<(), StoreError>;

    /// Insert an immutable history sample.
    ///
    /// Fails with [`StoreError::DuplicateSample`] if the key already exists.
    async fn append_history(
        &self,
        party: &PartyId,
        participant: &ParticipantId,
        position: Position,
        timestamp: Timestamp,
    ) -> Result<(), StoreError>;

    /// Snapshot of every participant's current position in the party
    async fn list_current(&self, party: &PartyId) -> Result<Vec<CurrentPosition>, StoreError>;

    /// History samples with `timestamp >= since`, newest first (ties by
    /// participant id), capped at `limit` when given
    async fn query_history(
        &self,
        party: &PartyId,
        since: Timestamp,
        limit: Option<usize>,
    ) -> Result<Vec<HistorySample>, StoreError>;
}

/// Persist one sample: history entry plus current-position overwrite, both
/// under the same capture timestamp
pub async fn record_sample(
    store: &dyn LocationStore,
    party: &PartyId,
    participant: &ParticipantId,
    position: Position,
    timestamp: Timestamp,
) -> Result<(), StoreError> {
    store
        .append_history(party, participant, position, timestamp)
        .await?;
    store
        .put_current(party, participant, position, timestamp)
        .await
}
