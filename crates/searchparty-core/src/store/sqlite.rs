//! SQLite-backed location store (requires "sqlite" feature)

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::schema::{Schema, SCHEMA_VERSION};
use super::LocationStore;
use crate::error::{Result, StoreError};
use crate::model::{
    CurrentPosition, HistorySample, ParticipantId, Party, PartyDirectory, PartyId, Position,
    Timestamp,
};

/// [`LocationStore`] and [`PartyDirectory`] over a single SQLite connection
pub struct SqliteLocationStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteLocationStore {
    /// Open (or create) a store at the given database path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn connection(&self) -> std::result::Result<MutexGuard<'_, rusqlite::Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {}", e)))
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        let current_version = Self::schema_version(&conn).unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(Schema::create_tables())?;
            Self::set_schema_version(&conn, SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    conn.execute_batch(migration)?;
                }
            }
            Self::set_schema_version(&conn, SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn schema_version(conn: &rusqlite::Connection) -> Option<u32> {
        conn.query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .ok()
    }

    fn set_schema_version(conn: &rusqlite::Connection, version: u32) -> Result<()> {
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        Ok(())
    }

    /// Insert or replace a party record (seeding by the owning application)
    pub fn register_party(&self, party: &Party) -> Result<()> {
        let participants_json =
            serde_json::to_string(&party.participants).map_err(StoreError::from)?;
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO parties
            (id, creator_id, participants, start_latitude, start_longitude, search_radius_km)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            rusqlite::params![
                party.id.as_str(),
                party.creator.as_str(),
                participants_json,
                party.start.latitude,
                party.start.longitude,
                party.search_radius_km,
            ],
        )?;
        Ok(())
    }

    fn row_to_current(row: &rusqlite::Row) -> rusqlite::Result<CurrentPosition> {
        let participant: String = row.get(0)?;
        Ok(CurrentPosition {
            participant: ParticipantId::from(participant),
            position: Position {
                latitude: row.get(1)?,
                longitude: row.get(2)?,
            },
            timestamp: Timestamp::from_millis(row.get(3)?),
        })
    }

    fn row_to_sample(row: &rusqlite::Row) -> rusqlite::Result<HistorySample> {
        let participant: String = row.get(0)?;
        Ok(HistorySample {
            participant: ParticipantId::from(participant),
            position: Position {
                latitude: row.get(1)?,
                longitude: row.get(2)?,
            },
            timestamp: Timestamp::from_millis(row.get(3)?),
        })
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl LocationStore for SqliteLocationStore {
    async fn put_current(
        &self,
        party: &PartyId,
        participant: &ParticipantId,
        position: Position,
        timestamp: Timestamp,
    ) -> std::result::Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO live_locations
            (party_id, participant_id, latitude, longitude, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            rusqlite::params![
                party.as_str(),
                participant.as_str(),
                position.latitude,
                position.longitude,
                timestamp.as_millis(),
            ],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn append_history(
        &self,
        party: &PartyId,
        participant: &ParticipantId,
        position: Position,
        timestamp: Timestamp,
    ) -> std::result::Result<(), StoreError> {
        let conn = self.connection()?;
        let result = conn.execute(
            r#"
            INSERT INTO location_history
            (party_id, participant_id, latitude, longitude, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            rusqlite::params![
                party.as_str(),
                participant.as_str(),
                position.latitude,
                position.longitude,
                timestamp.as_millis(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::DuplicateSample {
                participant: participant.to_string(),
                timestamp: timestamp.as_millis(),
            }),
            Err(e) => Err(StoreError::WriteFailed(e.to_string())),
        }
    }

    async fn list_current(
        &self,
        party: &PartyId,
    ) -> std::result::Result<Vec<CurrentPosition>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT participant_id, latitude, longitude, timestamp FROM live_locations WHERE party_id = ?1",
        )?;

        let positions = stmt
            .query_map([party.as_str()], Self::row_to_current)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(positions)
    }

    async fn query_history(
        &self,
        party: &PartyId,
        since: Timestamp,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<HistorySample>, StoreError> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);

        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT participant_id, latitude, longitude, timestamp
            FROM location_history
            WHERE party_id = ?1 AND timestamp >= ?2
            ORDER BY timestamp DESC, participant_id ASC
            LIMIT ?3
            "#,
        )?;

        let samples = stmt
            .query_map(
                rusqlite::params![party.as_str(), since.as_millis(), limit],
                Self::row_to_sample,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(samples)
    }
}

#[async_trait]
impl PartyDirectory for SqliteLocationStore {
    async fn get_party(&self, id: &PartyId) -> std::result::Result<Option<Party>, StoreError> {
        let conn = self.connection()?;
        let result = conn.query_row(
            r#"
            SELECT id, creator_id, participants, start_latitude, start_longitude, search_radius_km
            FROM parties WHERE id = ?1
            "#,
            [id.as_str()],
            |row| {
                let id: String = row.get(0)?;
                let creator: String = row.get(1)?;
                let participants_json: String = row.get(2)?;
                Ok((
                    id,
                    creator,
                    participants_json,
                    Position {
                        latitude: row.get(3)?,
                        longitude: row.get(4)?,
                    },
                    row.get::<_, f64>(5)?,
                ))
            },
        );

        match result {
            Ok((id, creator, participants_json, start, search_radius_km)) => Ok(Some(Party {
                id: PartyId::from(id),
                creator: ParticipantId::from(creator),
                participants: serde_json::from_str(&participants_json)?,
                start,
                search_radius_km,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        }
    }
}
