//! In-memory location store

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::LocationStore;
use crate::error::StoreError;
use crate::model::{CurrentPosition, HistorySample, ParticipantId, PartyId, Position, Timestamp};

#[derive(Debug, Default)]
struct PartyLocations {
    current: HashMap<ParticipantId, CurrentPosition>,
    /// timestamp → participant → position; windowed reads only touch the range
    history: BTreeMap<Timestamp, BTreeMap<ParticipantId, Position>>,
    history_len: usize,
}

/// In-memory [`LocationStore`] implementation
#[derive(Debug, Default)]
pub struct InMemoryLocationStore {
    parties: RwLock<HashMap<PartyId, PartyLocations>>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self {
            parties: RwLock::new(HashMap::new()),
        }
    }

    /// Number of history samples stored for a party
    pub fn history_len(&self, party: &PartyId) -> usize {
        self.parties
            .read()
            .map(|parties| parties.get(party).map(|p| p.history_len).unwrap_or(0))
            .unwrap_or(0)
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {}", err))
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn put_current(
        &self,
        party: &PartyId,
        participant: &ParticipantId,
        position: Position,
        timestamp: Timestamp,
    ) -> Result<(), StoreError> {
        let mut parties = self
            .parties
            .write()
            .map_err(|e| StoreError::WriteFailed(format!("lock poisoned: {}", e)))?;
        parties.entry(party.clone()).or_default().current.insert(
            participant.clone(),
            CurrentPosition {
                participant: participant.clone(),
                position,
                timestamp,
            },
        );
        Ok(())
    }

    async fn append_history(
        &self,
        party: &PartyId,
        participant: &ParticipantId,
        position: Position,
        timestamp: Timestamp,
    ) -> Result<(), StoreError> {
        let mut parties = self
            .parties
            .write()
            .map_err(|e| StoreError::WriteFailed(format!("lock poisoned: {}", e)))?;
        let locations = parties.entry(party.clone()).or_default();
        let at_timestamp = locations.history.entry(timestamp).or_default();
        if at_timestamp.contains_key(participant) {
            return Err(StoreError::DuplicateSample {
                participant: participant.to_string(),
                timestamp: timestamp.as_millis(),
            });
        }
        at_timestamp.insert(participant.clone(), position);
        locations.history_len += 1;
        Ok(())
    }

    async fn list_current(&self, party: &PartyId) -> Result<Vec<CurrentPosition>, StoreError> {
        let parties = self.parties.read().map_err(poisoned)?;
        Ok(parties
            .get(party)
            .map(|p| p.current.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query_history(
        &self,
        party: &PartyId,
        since: Timestamp,
        limit: Option<usize>,
    ) -> Result<Vec<HistorySample>, StoreError> {
        let parties = self.parties.read().map_err(poisoned)?;
        let Some(locations) = parties.get(party) else {
            return Ok(Vec::new());
        };

        let samples = locations
            .history
            .range(since..)
            .rev()
            .flat_map(|(timestamp, by_participant)| {
                by_participant
                    .iter()
                    .map(move |(participant, position)| HistorySample {
                        participant: participant.clone(),
                        position: *position,
                        timestamp: *timestamp,
                    })
            })
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(lat: f64, lon: f64) -> Position {
        Position::new(lat, lon).unwrap()
    }

    #[tokio::test]
    async fn test_put_current_overwrites() {
        let store = InMemoryLocationStore::new();
        let party = PartyId::from("p1");
        let alice = ParticipantId::from("alice");

        store
            .put_current(&party, &alice, pos(1.0, 1.0), Timestamp::from_millis(1))
            .await
            .unwrap();
        store
            .put_current(&party, &alice, pos(2.0, 2.0), Timestamp::from_millis(2))
            .await
            .unwrap();

        let current = store.list_current(&party).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].position, pos(2.0, 2.0));
        assert_eq!(current[0].timestamp, Timestamp::from_millis(2));
    }

    #[tokio::test]
    async fn test_history_keeps_distinct_timestamps() {
        let store = InMemoryLocationStore::new();
        let party = PartyId::from("p1");
        let alice = ParticipantId::from("alice");

        for ts in [100, 200] {
            store
                .append_history(&party, &alice, pos(1.0, 1.0), Timestamp::from_millis(ts))
                .await
                .unwrap();
        }

        let history = store
            .query_history(&party, Timestamp::from_millis(0), None)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(store.history_len(&party), 2);
    }

    #[tokio::test]
    async fn test_same_millisecond_different_participants() {
        let store = InMemoryLocationStore::new();
        let party = PartyId::from("p1");
        let ts = Timestamp::from_millis(100);

        store
            .append_history(&party, &ParticipantId::from("a"), pos(1.0, 1.0), ts)
            .await
            .unwrap();
        store
            .append_history(&party, &ParticipantId::from("b"), pos(2.0, 2.0), ts)
            .await
            .unwrap();

        let err = store
            .append_history(&party, &ParticipantId::from("a"), pos(3.0, 3.0), ts)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSample { .. }));

        let history = store
            .query_history(&party, Timestamp::from_millis(0), None)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].position, pos(1.0, 1.0));
    }

    #[tokio::test]
    async fn test_query_window_order_and_limit() {
        let store = InMemoryLocationStore::new();
        let party = PartyId::from("p1");

        for (who, ts) in [("b", 300), ("a", 300), ("a", 100), ("c", 200), ("a", 50)] {
            store
                .append_history(
                    &party,
                    &ParticipantId::from(who),
                    pos(0.0, 0.0),
                    Timestamp::from_millis(ts),
                )
                .await
                .unwrap();
        }

        let window = store
            .query_history(&party, Timestamp::from_millis(100), None)
            .await
            .unwrap();
        let keys: Vec<_> = window
            .iter()
            .map(|s| (s.participant.to_string(), s.timestamp.as_millis()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a".to_string(), 300),
                ("b".to_string(), 300),
                ("c".to_string(), 200),
                ("a".to_string(), 100),
            ]
        );

        let capped = store
            .query_history(&party, Timestamp::from_millis(0), Some(2))
            .await
            .unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[1].participant, ParticipantId::from("b"));
    }

    #[tokio::test]
    async fn test_unknown_party_is_empty() {
        let store = InMemoryLocationStore::new();
        let party = PartyId::from("ghost");
        assert!(store.list_current(&party).await.unwrap().is_empty());
        assert!(store
            .query_history(&party, Timestamp::from_millis(0), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_parties_are_isolated() {
        let store = InMemoryLocationStore::new();
        let alice = ParticipantId::from("alice");
        store
            .put_current(&PartyId::from("p1"), &alice, pos(1.0, 1.0), Timestamp::from_millis(1))
            .await
            .unwrap();

        assert!(store
            .list_current(&PartyId::from("p2"))
            .await
            .unwrap()
            .is_empty());
    }
}
