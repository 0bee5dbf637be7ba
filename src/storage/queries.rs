//! Basic database query operations

use super::codec::{encode_list, list_column};
use super::schema::MatchDatabase;
use crate::cli::types::{MatchId, Role};
use crate::error::Result;
use crate::pipeline::{MatchRecord, Per10Stats, PlayerRound, Tables};
use rusqlite::{params, Row};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

const MATCH_COLUMNS: &str = "match_id, competition_type, competition_id, competition_name,
     started_at, finished_at, winner, faction_1, faction_2, faction_1_score, faction_2_score,
     maps, map_types, map_names, faction_1_map_scores, faction_2_map_scores, map_winner";

const PLAYER_COLUMNS: &str = "nickname, match_id, round_index, role, eliminations, assists,
     deaths, kd_ratio, damage_dealt, healing_done, damage_mitigated, result, mode, map,
     duration, deaths_per_10, eliminations_per_10, assists_per_10, damage_dealt_per_10,
     healing_done_per_10, value";

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl MatchDatabase {
    /// Insert or update match rows in one transaction. Returns rows written.
    ///
    /// Existing rows are updated in place so stored player rows keep their
    /// parent.
    pub fn upsert_matches(&mut self, matches: &[MatchRecord]) -> Result<usize> {
        let stored_at = now();
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO matches ({MATCH_COLUMNS}, stored_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(match_id) DO UPDATE SET
                    competition_type = excluded.competition_type,
                    competition_id = excluded.competition_id,
                    competition_name = excluded.competition_name,
                    started_at = excluded.started_at,
                    finished_at = excluded.finished_at,
                    winner = excluded.winner,
                    faction_1 = excluded.faction_1,
                    faction_2 = excluded.faction_2,
                    faction_1_score = excluded.faction_1_score,
                    faction_2_score = excluded.faction_2_score,
                    maps = excluded.maps,
                    map_types = excluded.map_types,
                    map_names = excluded.map_names,
                    faction_1_map_scores = excluded.faction_1_map_scores,
                    faction_2_map_scores = excluded.faction_2_map_scores,
                    map_winner = excluded.map_winner,
                    stored_at = excluded.stored_at"
            ))?;
            for m in matches {
                written += stmt.execute(params![
                    m.match_id.as_str(),
                    m.competition_type,
                    m.competition_id,
                    m.competition_name,
                    m.started_at,
                    m.finished_at,
                    m.winner,
                    m.faction_1,
                    m.faction_2,
                    m.faction_1_score,
                    m.faction_2_score,
                    encode_list(&m.maps)?,
                    encode_list(&m.map_types)?,
                    encode_list(&m.map_names)?,
                    encode_list(&m.faction_1_map_scores)?,
                    encode_list(&m.faction_2_map_scores)?,
                    encode_list(&m.map_winner)?,
                    stored_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Replace the stored player rows of every match in `players` in one
    /// transaction. Returns rows written.
    pub fn upsert_players(&mut self, players: &[PlayerRound]) -> Result<usize> {
        let match_ids: BTreeSet<&str> = players.iter().map(|p| p.match_id.as_str()).collect();
        let tx = self.conn.transaction()?;
        for id in &match_ids {
            tx.execute("DELETE FROM players WHERE match_id = ?", params![id])?;
        }
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO players ({PLAYER_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ))?;
            for p in players {
                let rates = p.per_10.as_ref();
                written += stmt.execute(params![
                    p.nickname,
                    p.match_id.as_str(),
                    p.round_index as i64,
                    p.role.to_string(),
                    p.eliminations,
                    p.assists,
                    p.deaths,
                    p.kd_ratio,
                    p.damage_dealt,
                    p.healing_done,
                    p.damage_mitigated,
                    p.won,
                    p.mode,
                    p.map,
                    p.duration,
                    rates.map(|r| r.deaths),
                    rates.map(|r| r.eliminations),
                    rates.map(|r| r.assists),
                    rates.map(|r| r.damage_dealt),
                    rates.map(|r| r.healing_done),
                    p.value,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// All stored matches, ordered by match id.
    pub fn load_matches(&self) -> Result<Vec<MatchRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {MATCH_COLUMNS} FROM matches ORDER BY match_id"))?;
        let rows = stmt.query_map([], row_to_match)?;

        let mut matches = Vec::new();
        for row in rows {
            matches.push(row?);
        }
        Ok(matches)
    }

    /// Stored player rows in insertion order, optionally for one nickname.
    pub fn load_players(&self, nickname: Option<&str>) -> Result<Vec<PlayerRound>> {
        let mut players = Vec::new();
        match nickname {
            Some(nick) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PLAYER_COLUMNS} FROM players WHERE nickname = ? ORDER BY rowid"
                ))?;
                let rows = stmt.query_map(params![nick], row_to_player)?;
                for row in rows {
                    players.push(row?);
                }
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY rowid"))?;
                let rows = stmt.query_map([], row_to_player)?;
                for row in rows {
                    players.push(row?);
                }
            }
        }
        Ok(players)
    }

    /// Both tables as they were stored.
    pub fn load_tables(&self) -> Result<Tables> {
        Ok(Tables::new(self.load_matches()?, self.load_players(None)?))
    }

    pub fn match_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Remove matches and their player rows. Returns matches removed.
    pub fn delete_matches(&mut self, match_ids: &[MatchId]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        for id in match_ids {
            tx.execute("DELETE FROM players WHERE match_id = ?", params![id.as_str()])?;
            removed += tx.execute("DELETE FROM matches WHERE match_id = ?", params![id.as_str()])?;
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Clear all data from the database
    pub fn clear_all_data(&mut self) -> Result<()> {
        // Players first due to foreign key
        self.conn.execute("DELETE FROM players", [])?;
        self.conn.execute("DELETE FROM matches", [])?;
        Ok(())
    }
}

fn row_to_match(row: &Row) -> rusqlite::Result<MatchRecord> {
    Ok(MatchRecord {
        match_id: MatchId::new(row.get::<_, String>(0)?),
        competition_type: row.get(1)?,
        competition_id: row.get(2)?,
        competition_name: row.get(3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        winner: row.get(6)?,
        faction_1: row.get(7)?,
        faction_2: row.get(8)?,
        faction_1_score: row.get(9)?,
        faction_2_score: row.get(10)?,
        maps: list_column(row, 11)?,
        map_types: list_column(row, 12)?,
        map_names: list_column(row, 13)?,
        faction_1_map_scores: list_column(row, 14)?,
        faction_2_map_scores: list_column(row, 15)?,
        map_winner: list_column(row, 16)?,
    })
}

fn row_to_player(row: &Row) -> rusqlite::Result<PlayerRound> {
    let role: String = row.get(3)?;
    let rates: [Option<f64>; 5] = [row.get(15)?, row.get(16)?, row.get(17)?, row.get(18)?, row.get(19)?];
    let per_10 = match rates {
        [Some(deaths), Some(eliminations), Some(assists), Some(damage_dealt), Some(healing_done)] => {
            Some(Per10Stats {
                deaths,
                eliminations,
                assists,
                damage_dealt,
                healing_done,
            })
        }
        _ => None,
    };

    Ok(PlayerRound {
        nickname: row.get(0)?,
        match_id: MatchId::new(row.get::<_, String>(1)?),
        round_index: row.get::<_, i64>(2)?.max(0) as usize,
        role: Role::from_upstream(Some(role.as_str())),
        eliminations: row.get(4)?,
        assists: row.get(5)?,
        deaths: row.get(6)?,
        kd_ratio: row.get(7)?,
        damage_dealt: row.get(8)?,
        healing_done: row.get(9)?,
        damage_mitigated: row.get(10)?,
        won: row.get(11)?,
        mode: row.get(12)?,
        map: row.get(13)?,
        duration: row.get(14)?,
        per_10,
        value: row.get(20)?,
    })
}
