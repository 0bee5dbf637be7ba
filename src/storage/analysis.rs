//! Long-format export of player rows
//!
//! Each player row becomes one row per stat column, keyed by the row's
//! identifying columns. This is the shape plotting and regression tools
//! expect.

use super::schema::MatchDatabase;
use crate::cli::types::{MatchId, Role};
use crate::error::Result;
use crate::pipeline::PlayerRound;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Stat columns melted into `stat_type`/`stat_value`, in output order.
pub const STAT_COLUMNS: [&str; 13] = [
    "eliminations",
    "assists",
    "deaths",
    "kd_ratio",
    "damage_dealt",
    "healing_done",
    "damage_mitigated",
    "deaths_per_10",
    "eliminations_per_10",
    "assists_per_10",
    "damage_dealt_per_10",
    "healing_done_per_10",
    "value",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongStatRow {
    pub nickname: String,
    pub match_id: MatchId,
    pub role: Role,
    pub mode: String,
    pub map: String,
    pub duration: Option<f64>,
    pub result: bool,
    pub stat_type: String,
    /// `None` when a derived column was never computed for the row.
    pub stat_value: Option<f64>,
}

fn stat_values(row: &PlayerRound) -> [Option<f64>; 13] {
    let rates = row.per_10.as_ref();
    [
        Some(row.eliminations as f64),
        Some(row.assists as f64),
        Some(row.deaths as f64),
        Some(row.kd_ratio),
        Some(row.damage_dealt as f64),
        Some(row.healing_done as f64),
        Some(row.damage_mitigated as f64),
        rates.map(|r| r.deaths),
        rates.map(|r| r.eliminations),
        rates.map(|r| r.assists),
        rates.map(|r| r.damage_dealt),
        rates.map(|r| r.healing_done),
        row.value,
    ]
}

/// Melt player rows: `players.len() * STAT_COLUMNS.len()` rows, grouped by
/// stat column.
pub fn melt(players: &[PlayerRound]) -> Vec<LongStatRow> {
    let values: Vec<[Option<f64>; 13]> = players.iter().map(stat_values).collect();

    let mut long = Vec::with_capacity(players.len() * STAT_COLUMNS.len());
    for (col, stat_type) in STAT_COLUMNS.iter().enumerate() {
        for (row, vals) in players.iter().zip(&values) {
            long.push(LongStatRow {
                nickname: row.nickname.clone(),
                match_id: row.match_id.clone(),
                role: row.role,
                mode: row.mode.clone(),
                map: row.map.clone(),
                duration: row.duration,
                result: row.won,
                stat_type: stat_type.to_string(),
                stat_value: vals[col],
            });
        }
    }
    long
}

/// Write rows as JSON lines. Returns the number of lines written.
pub fn write_json_lines<W: Write>(rows: &[LongStatRow], mut writer: W) -> Result<usize> {
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(rows.len())
}

impl MatchDatabase {
    /// Stored player rows in long format, optionally for one nickname.
    pub fn long_format(&self, nickname: Option<&str>) -> Result<Vec<LongStatRow>> {
        let players = self.load_players(nickname)?;
        Ok(melt(&players))
    }
}
