//! Storage layer for processed match data
//!
//! SQLite is the sink for the two output tables:
//! - `schema`: database connection and schema management
//! - `codec`: JSON text encoding for list-valued columns
//! - `queries`: inserts, reloads and clearing
//! - `analysis`: long-format export of player rows

pub mod analysis;
pub mod codec;
pub mod queries;
pub mod schema;


pub use analysis::{melt, write_json_lines, LongStatRow, STAT_COLUMNS};
pub use schema::MatchDatabase;

use crate::error::Result;
use crate::pipeline::{MatchRecord, PlayerRound, Tables};

/// Destination for the matches and players tables.
///
/// Failures here are storage errors and leave the in-memory tables intact,
/// so callers may retry the upload.
pub trait Sink {
    fn insert_matches(&mut self, matches: &[MatchRecord]) -> Result<usize>;

    fn insert_players(&mut self, players: &[PlayerRound]) -> Result<usize>;

    /// Write both tables, matches first.
    fn write_tables(&mut self, tables: &Tables) -> Result<(usize, usize)> {
        let matches: Vec<MatchRecord> = tables.matches.values().cloned().collect();
        let match_count = self.insert_matches(&matches)?;
        let player_count = self.insert_players(&tables.players)?;
        Ok((match_count, player_count))
    }
}

impl Sink for MatchDatabase {
    fn insert_matches(&mut self, matches: &[MatchRecord]) -> Result<usize> {
        self.upsert_matches(matches)
    }

    fn insert_players(&mut self, players: &[PlayerRound]) -> Result<usize> {
        self.upsert_players(players)
    }
}
