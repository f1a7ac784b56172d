//! SQLite schema for location storage

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 2;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Party metadata (owned by the surrounding application, read-only here)
CREATE TABLE IF NOT EXISTS parties (
    id TEXT PRIMARY KEY,
    creator_id TEXT NOT NULL,
    participants TEXT NOT NULL,
    start_latitude REAL NOT NULL,
    start_longitude REAL NOT NULL,
    search_radius_km REAL NOT NULL
);

-- Current position, one row per (party, participant), overwritten on each sample
CREATE TABLE IF NOT EXISTS live_locations (
    party_id TEXT NOT NULL,
    participant_id TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    timestamp INTEGER NOT NULL,
    PRIMARY KEY (party_id, participant_id)
);

-- Position history (append-only)
CREATE TABLE IF NOT EXISTS location_history (
    party_id TEXT NOT NULL,
    participant_id TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    timestamp INTEGER NOT NULL,
    PRIMARY KEY (party_id, participant_id, timestamp)
);

CREATE INDEX IF NOT EXISTS idx_history_party_time ON location_history(party_id, timestamp DESC);
"#
    }

    /// Get migration SQL for a specific version
    pub fn migration(from_version: u32, to_version: u32) -> Option<&'static str> {
        match (from_version, to_version) {
            // v1 only had the primary key; windowed reads scanned the party
            (1, 2) => Some(
                "CREATE INDEX IF NOT EXISTS idx_history_party_time ON location_history(party_id, timestamp DESC);",
            ),
            _ => None,
        }
    }
}
