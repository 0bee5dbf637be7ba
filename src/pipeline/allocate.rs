//! Apportioning a match's playing time across its rounds.
//!
//! Each round gets a share of the match duration proportional to the points
//! scored in it, after the map-type adjustment. Players then receive the
//! shares of the rounds they played, which becomes the `duration` of their
//! per-round rows.

use std::collections::HashSet;
use std::fmt;

use super::report::{BatchReport, DropReason};
use super::tables::{MatchRecord, PlayerRound, Tables};
use super::telemetry::{PipelineEvent, SharedTelemetry, Stage};
use crate::cli::types::{MapType, MatchId, RoundSelection};
use crate::error::{PipelineError, Result};

/// Why one match could not be allocated.
#[derive(Debug)]
pub enum AllocationFailure {
    /// A player's rows and the selected rounds disagree.
    Misaligned {
        nickname: String,
        rows: usize,
        selected: usize,
    },
    Defect(PipelineError),
}

impl AllocationFailure {
    pub fn reason(&self) -> DropReason {
        match self {
            AllocationFailure::Misaligned { .. } => DropReason::RoundMisalignment,
            AllocationFailure::Defect(_) => DropReason::Defect,
        }
    }
}

impl fmt::Display for AllocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationFailure::Misaligned {
                nickname,
                rows,
                selected,
            } => write!(
                f,
                "{nickname} has {rows} round rows but {selected} rounds were selected"
            ),
            AllocationFailure::Defect(err) => write!(f, "{err}"),
        }
    }
}

impl From<PipelineError> for AllocationFailure {
    fn from(err: PipelineError) -> Self {
        AllocationFailure::Defect(err)
    }
}

/// Per-round share of the match duration, in seconds.
///
/// The match duration is truncated to whole seconds first, so the shares sum
/// to that whole-second total. The plausibility filter is expected to have
/// removed matches with no points or no playing time; meeting one here is a
/// defect.
pub fn round_shares(record: &MatchRecord) -> Result<Vec<f64>> {
    let duration = record
        .declared_duration()
        .ok_or_else(|| PipelineError::precondition(record.match_id.as_str(), "no declared duration"))?
        .trunc();
    if duration <= 0.0 {
        return Err(PipelineError::precondition(
            record.match_id.as_str(),
            format!("declared duration {duration}s is not positive"),
        ));
    }

    let points = record.adjusted_round_points();
    let sum_points: f64 = points.iter().sum();
    if sum_points <= 0.0 {
        return Err(PipelineError::precondition(
            record.match_id.as_str(),
            "no adjusted points to apportion duration by",
        ));
    }

    Ok(points.iter().map(|p| p / sum_points * duration).collect())
}

pub struct Allocator {
    telemetry: SharedTelemetry,
    selection: RoundSelection,
}

impl Allocator {
    pub fn new(selection: RoundSelection, telemetry: SharedTelemetry) -> Self {
        Self {
            telemetry,
            selection,
        }
    }

    /// Fill `duration` on every player row. A match that cannot be allocated
    /// is dropped on its own; the rest of the batch continues.
    pub fn apply(&self, mut tables: Tables, report: &mut BatchReport) -> Tables {
        let match_ids: Vec<MatchId> = tables.matches.keys().cloned().collect();

        for match_id in match_ids {
            let outcome = match tables.matches.get(&match_id) {
                Some(record) => self.allocate_match(record, &tables.players),
                None => continue,
            };

            match outcome {
                Ok(assignments) => {
                    for (row, duration) in assignments {
                        tables.players[row].duration = Some(duration);
                    }
                }
                Err(failure) => {
                    let player_rows = tables.drop_match(&match_id);
                    let reason = failure.reason();
                    report.record_drop(reason, player_rows);
                    self.telemetry.record(PipelineEvent::MatchDropped {
                        match_id,
                        reason,
                        player_rows,
                        detail: failure.to_string(),
                    });
                }
            }
        }

        self.telemetry.record(PipelineEvent::StageFinished {
            stage: Stage::Allocate,
            matches: tables.matches.len(),
            players: tables.players.len(),
        });
        tables
    }

    /// Work out `(player row index, seconds)` for every row of one match
    /// without touching the table.
    pub fn allocate_match(
        &self,
        record: &MatchRecord,
        players: &[PlayerRound],
    ) -> std::result::Result<Vec<(usize, f64)>, AllocationFailure> {
        let shares = round_shares(record)?;
        let mut assignments = Vec::new();

        for (nickname, rows) in rows_by_player(&record.match_id, players) {
            let selected = match self.selection {
                RoundSelection::ModeMask => select_by_mode(record, &shares, &rows, players),
                RoundSelection::RoundIndex => select_by_index(&shares, &rows, players),
            };
            if selected.len() != rows.len() {
                return Err(AllocationFailure::Misaligned {
                    nickname: nickname.to_string(),
                    rows: rows.len(),
                    selected: selected.len(),
                });
            }
            assignments.extend(rows.into_iter().zip(selected));
        }

        Ok(assignments)
    }
}

/// Row indices of each player in a match, players in order of first
/// appearance and rows in table order.
fn rows_by_player<'a>(match_id: &MatchId, players: &'a [PlayerRound]) -> Vec<(&'a str, Vec<usize>)> {
    let mut grouped: Vec<(&str, Vec<usize>)> = Vec::new();
    for (idx, row) in players.iter().enumerate() {
        if &row.match_id != match_id {
            continue;
        }
        match grouped.iter_mut().find(|(nick, _)| *nick == row.nickname) {
            Some((_, rows)) => rows.push(idx),
            None => grouped.push((row.nickname.as_str(), vec![idx])),
        }
    }
    grouped
}

/// Keep every round whose map type is among the modes the player was seen in.
fn select_by_mode(
    record: &MatchRecord,
    shares: &[f64],
    rows: &[usize],
    players: &[PlayerRound],
) -> Vec<f64> {
    let modes: HashSet<MapType> = rows
        .iter()
        .map(|&i| MapType::from_mode(&players[i].mode))
        .collect();
    record
        .map_types
        .iter()
        .zip(shares)
        .filter(|(map_type, _)| modes.contains(map_type))
        .map(|(_, &share)| share)
        .collect()
}

/// Take the share at each row's recorded round index; rows pointing past the
/// last round select nothing.
fn select_by_index(shares: &[f64], rows: &[usize], players: &[PlayerRound]) -> Vec<f64> {
    rows.iter()
        .filter_map(|&i| shares.get(players[i].round_index).copied())
        .collect()
}
