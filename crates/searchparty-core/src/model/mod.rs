//! Shared data model
//!
//! Identifiers, timestamps and coordinates, the durable location records
//! (current position and history sample), and the read-only party metadata
//! supplied by the surrounding application.

mod ids;
mod party;
mod position;

pub use ids::{ParticipantId, PartyId};
pub use party::{InMemoryPartyDirectory, Party, PartyDirectory, SearchArea};
pub use position::{CurrentPosition, HistorySample, Position, Timestamp, MAX_CLOCK_SKEW_MS};
