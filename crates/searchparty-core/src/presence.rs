//! Live presence for a party
//!
//! Splits the party's current positions into the caller's own record and
//! everyone else's. No staleness filtering happens here: "current" is the
//! latest written value, however old.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CurrentPosition, ParticipantId, PartyId};
use crate::store::LocationStore;

/// Current positions of a party as seen by one participant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceView {
    /// The caller's own record, if it has been written
    #[serde(rename = "self")]
    pub self_position: Option<CurrentPosition>,
    /// Every other participant's record, ordered by participant id
    pub others: Vec<CurrentPosition>,
}

impl PresenceView {
    /// Number of participants with a known position
    pub fn len(&self) -> usize {
        self.others.len() + usize::from(self.self_position.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stateless presence reader
#[derive(Clone)]
pub struct PresenceMerger {
    store: Arc<dyn LocationStore>,
}

impl PresenceMerger {
    pub fn new(store: Arc<dyn LocationStore>) -> Self {
        Self { store }
    }

    /// Partition the party's current positions around `self_id`.
    ///
    /// An unknown or empty party yields an empty view.
    pub async fn merge(&self, party: &PartyId, self_id: &ParticipantId) -> Result<PresenceView> {
        let mut current = self.store.list_current(party).await?;
        current.sort_by(|a, b| a.participant.cmp(&b.participant));

        let mut view = PresenceView::default();
        for record in current {
            if &record.participant == self_id {
                view.self_position = Some(record);
            } else {
                view.others.push(record);
            }
        }

        tracing::trace!(
            party = %party,
            others = view.others.len(),
            has_self = view.self_position.is_some(),
            "merged presence"
        );
        Ok(view)
    }
}
