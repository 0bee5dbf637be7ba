//! Database schema and connection management

use crate::error::{PipelineError, Result};
use dirs::data_dir;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "overwatch_data.db";

/// Connection to the processed-data database
pub struct MatchDatabase {
    pub(crate) conn: Connection,
}

impl MatchDatabase {
    /// Open (or create) the database at `path` and ensure tables exist
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        let mut db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Default location: `<data dir>/faceit-ow/overwatch_data.db`
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = data_dir().ok_or_else(|| PipelineError::Cache {
            message: "Could not determine data directory".to_string(),
        })?;
        Ok(data_dir.join("faceit-ow").join(DATABASE_FILE))
    }

    /// Initialize the database schema
    pub(crate) fn initialize_schema(&mut self) -> Result<()> {
        // List-valued columns hold JSON arrays as text.
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS matches (
                match_id TEXT PRIMARY KEY,
                competition_type TEXT,
                competition_id TEXT,
                competition_name TEXT,
                started_at INTEGER,
                finished_at INTEGER,
                winner TEXT,
                faction_1 TEXT,
                faction_2 TEXT,
                faction_1_score INTEGER,
                faction_2_score INTEGER,
                maps TEXT NOT NULL,
                map_types TEXT NOT NULL,
                map_names TEXT NOT NULL,
                faction_1_map_scores TEXT NOT NULL,
                faction_2_map_scores TEXT NOT NULL,
                map_winner TEXT NOT NULL,
                stored_at INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS players (
                nickname TEXT NOT NULL,
                match_id TEXT NOT NULL,
                round_index INTEGER NOT NULL,
                role TEXT NOT NULL,
                eliminations INTEGER NOT NULL,
                assists INTEGER NOT NULL,
                deaths INTEGER NOT NULL,
                kd_ratio REAL NOT NULL,
                damage_dealt INTEGER NOT NULL,
                healing_done INTEGER NOT NULL,
                damage_mitigated INTEGER NOT NULL,
                result INTEGER NOT NULL,
                mode TEXT NOT NULL,
                map TEXT NOT NULL,
                duration REAL,
                deaths_per_10 REAL,
                eliminations_per_10 REAL,
                assists_per_10 REAL,
                damage_dealt_per_10 REAL,
                healing_done_per_10 REAL,
                value REAL,
                PRIMARY KEY (nickname, match_id, round_index),
                FOREIGN KEY (match_id) REFERENCES matches(match_id)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_players_match ON players(match_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_players_nickname ON players(nickname)",
            [],
        )?;

        Ok(())
    }
}
