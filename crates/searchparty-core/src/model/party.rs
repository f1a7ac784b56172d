//! Party metadata and the search area it defines
//!
//! Parties are created and edited by the surrounding application; the core
//! only ever reads them through [`PartyDirectory`].

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ParticipantId, PartyId, Position};
use crate::error::StoreError;

/// Mean Earth radius in kilometers (IUGG)
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A coordinated search effort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub creator: ParticipantId,
    pub participants: BTreeSet<ParticipantId>,
    pub start: Position,
    pub search_radius_km: f64,
}

impl Party {
    pub fn is_participant(&self, participant: &ParticipantId) -> bool {
        self.participants.contains(participant)
    }

    pub fn search_area(&self) -> SearchArea {
        SearchArea {
            center: self.start,
            radius_km: self.search_radius_km,
        }
    }
}

/// Circular search area around the party's start point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchArea {
    pub center: Position,
    pub radius_km: f64,
}

impl SearchArea {
    pub fn radius_meters(&self) -> f64 {
        self.radius_km * 1000.0
    }

    /// Great-circle distance from the center (haversine)
    pub fn distance_km(&self, point: &Position) -> f64 {
        haversine_km(&self.center, point)
    }

    pub fn contains(&self, point: &Position) -> bool {
        self.distance_km(point) <= self.radius_km
    }
}

fn haversine_km(a: &Position, b: &Position) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Read access to party metadata owned by the surrounding application
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    /// Look up a party; `None` when it does not exist
    async fn get_party(&self, id: &PartyId) -> Result<Option<Party>, StoreError>;
}

/// In-memory party directory
#[derive(Debug, Default)]
pub struct InMemoryPartyDirectory {
    parties: RwLock<HashMap<PartyId, Party>>,
}

impl InMemoryPartyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a party record (seeding by the owning application)
    pub fn register(&self, party: Party) {
        if let Ok(mut parties) = self.parties.write() {
            parties.insert(party.id.clone(), party);
        }
    }
}

#[async_trait]
impl PartyDirectory for InMemoryPartyDirectory {
    async fn get_party(&self, id: &PartyId) -> Result<Option<Party>, StoreError> {
        let parties = self
            .parties
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        Ok(parties.get(id).cloned())
    }
}
