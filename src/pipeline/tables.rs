//! Match and player tables, and the builder that fills them from extracted
//! records.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::extract::{value_to_i64, value_to_text, Extractor, RawPlayerEntry};
use super::report::BatchReport;
use super::telemetry::{PipelineEvent, SharedTelemetry, Stage};
use crate::cli::types::{MapType, MatchId, Role};

/// Share of the wall-clock match time that counts as playing time.
pub const DURATION_FACTOR: f64 = 0.9;

/// Upstream stat names and the canonical columns they land in.
pub const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("Role", "role"),
    ("Eliminations", "eliminations"),
    ("Assists", "assists"),
    ("Deaths", "deaths"),
    ("K/D Ratio", "kd_ratio"),
    ("Damage Dealt", "damage_dealt"),
    ("Healing Done", "healing_done"),
    ("Damage Mitigated", "damage_mitigated"),
    ("Result", "result"),
];

/// One row of the matches table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub competition_type: Option<String>,
    pub competition_id: Option<String>,
    pub competition_name: Option<String>,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub winner: Option<String>,
    pub faction_1: Option<String>,
    pub faction_2: Option<String>,
    pub faction_1_score: Option<i64>,
    pub faction_2_score: Option<i64>,
    pub maps: Vec<String>,
    pub map_types: Vec<MapType>,
    /// Display names of `maps`, `"Unknown"` for unlisted ids.
    pub map_names: Vec<String>,
    pub faction_1_map_scores: Vec<i64>,
    pub faction_2_map_scores: Vec<i64>,
    pub map_winner: Vec<Option<String>>,
}

impl MatchRecord {
    /// Names of scalar fields that are null.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let checks = [
            ("competition_type", self.competition_type.is_none()),
            ("competition_id", self.competition_id.is_none()),
            ("competition_name", self.competition_name.is_none()),
            ("started_at", self.started_at.is_none()),
            ("finished_at", self.finished_at.is_none()),
            ("winner", self.winner.is_none()),
            ("faction_1", self.faction_1.is_none()),
            ("faction_2", self.faction_2.is_none()),
            ("faction_1_score", self.faction_1_score.is_none()),
            ("faction_2_score", self.faction_2_score.is_none()),
        ];
        checks
            .into_iter()
            .filter_map(|(name, missing)| missing.then_some(name))
            .collect()
    }

    /// True when maps, map types and both per-round score lists share one
    /// non-zero length.
    pub fn rounds_consistent(&self) -> bool {
        let n = self.maps.len();
        n > 0
            && self.map_types.len() == n
            && self.faction_1_map_scores.len() == n
            && self.faction_2_map_scores.len() == n
    }

    /// Playing time in seconds: 90% of the gap between start and finish.
    /// `None` when either timestamp is missing or the gap overflows.
    pub fn declared_duration(&self) -> Option<f64> {
        let (start, finish) = (self.started_at?, self.finished_at?);
        let elapsed = finish.checked_sub(start)?;
        Some(elapsed as f64 * DURATION_FACTOR)
    }

    /// Combined score of both factions per round after the map-type adjustment.
    pub fn adjusted_round_points(&self) -> Vec<f64> {
        self.map_types
            .iter()
            .zip(&self.faction_1_map_scores)
            .zip(&self.faction_2_map_scores)
            .map(|((map_type, &f1), &f2)| {
                map_type.adjust_score(f1 as f64) + map_type.adjust_score(f2 as f64)
            })
            .collect()
    }
}

/// Rate-normalised counting stats, per ten minutes of allocated time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Per10Stats {
    pub deaths: f64,
    pub eliminations: f64,
    pub assists: f64,
    pub damage_dealt: f64,
    pub healing_done: f64,
}

/// One row of the players table: one player in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRound {
    pub nickname: String,
    pub match_id: MatchId,
    pub round_index: usize,
    pub role: Role,
    pub eliminations: i64,
    pub assists: i64,
    pub deaths: i64,
    pub kd_ratio: f64,
    pub damage_dealt: i64,
    pub healing_done: i64,
    pub damage_mitigated: i64,
    pub won: bool,
    pub mode: String,
    pub map: String,
    /// Allocated round duration in seconds, set by the allocator.
    pub duration: Option<f64>,
    /// Set by the metrics engine.
    pub per_10: Option<Per10Stats>,
    /// Set by the metrics engine.
    pub value: Option<f64>,
}

/// Eliminations over deaths, or plain eliminations when there were no deaths.
pub fn kd_ratio(eliminations: i64, deaths: i64) -> f64 {
    if deaths == 0 {
        eliminations as f64
    } else {
        eliminations as f64 / deaths as f64
    }
}

/// Both tables of one ingestion batch. Match ids join the two; removing a
/// match always goes through [`Tables::drop_match`] so they stay joined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub matches: BTreeMap<MatchId, MatchRecord>,
    pub players: Vec<PlayerRound>,
}

impl Tables {
    pub fn new(matches: Vec<MatchRecord>, players: Vec<PlayerRound>) -> Self {
        Self {
            matches: matches
                .into_iter()
                .map(|m| (m.match_id.clone(), m))
                .collect(),
            players,
        }
    }

    /// Remove a match and every player row sharing its id. Returns the number
    /// of player rows removed.
    pub fn drop_match(&mut self, match_id: &MatchId) -> usize {
        self.matches.remove(match_id);
        let before = self.players.len();
        self.players.retain(|p| &p.match_id != match_id);
        before - self.players.len()
    }

    /// Match ids referenced by player rows.
    pub fn player_match_ids(&self) -> BTreeSet<MatchId> {
        self.players.iter().map(|p| p.match_id.clone()).collect()
    }

    /// All rows of one player, in insertion order.
    pub fn player_rows<'a>(
        &'a self,
        nickname: &'a str,
    ) -> impl Iterator<Item = &'a PlayerRound> + 'a {
        self.players.iter().filter(move |p| p.nickname == nickname)
    }
}

/// Accumulates extracted records into [`Tables`].
pub struct TableBuilder {
    telemetry: SharedTelemetry,
    tables: Tables,
    /// Match ids of every payload committed so far, including payloads whose
    /// details failed to extract.
    seen: BTreeSet<MatchId>,
}

impl TableBuilder {
    pub fn new(telemetry: SharedTelemetry) -> Self {
        Self {
            telemetry,
            tables: Tables::default(),
            seen: BTreeSet::new(),
        }
    }

    /// Move everything the extractor has produced into the tables, draining
    /// its buffers so nothing is merged twice. The first payload for a match
    /// id wins; later payloads for it are skipped whole.
    pub fn commit(&mut self, extractor: &mut Extractor, report: &mut BatchReport) {
        let batch = extractor.drain();

        for extracted in batch.matches {
            let Some(match_id) = extracted.match_id().cloned() else {
                continue;
            };
            if !self.seen.insert(match_id.clone()) {
                report.duplicate_matches += 1;
                self.telemetry.record(PipelineEvent::DuplicateMatch { match_id });
                continue;
            }

            if let Some(record) = extracted.details {
                self.tables.matches.insert(match_id, record);
            }
            for entry in extracted.players {
                let row = self.player_row(entry, report);
                self.tables.players.push(row);
            }
        }

        self.telemetry.record(PipelineEvent::StageFinished {
            stage: Stage::Build,
            matches: self.tables.matches.len(),
            players: self.tables.players.len(),
        });
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn finish(self) -> Tables {
        self.tables
    }

    fn player_row(&self, entry: RawPlayerEntry, report: &mut BatchReport) -> PlayerRound {
        let RawPlayerEntry {
            nickname,
            match_id,
            round_index,
            mode,
            map,
            player_stats,
        } = entry;
        let nickname = nickname.unwrap_or_default();
        let columns = canonical_columns(player_stats);

        let mut backfill = |column: &'static str| {
            report.backfilled_columns += 1;
            self.telemetry.record(PipelineEvent::ColumnBackfilled {
                nickname: nickname.clone(),
                match_id: match_id.clone(),
                column,
            });
        };

        let role = match columns.get("role").and_then(value_to_text) {
            Some(text) => Role::from_upstream(Some(&text)),
            None => {
                backfill("role");
                Role::Unknown
            }
        };
        let mut count = |column: &'static str| match columns.get(column).and_then(value_to_i64) {
            Some(v) => v,
            None => {
                backfill(column);
                0
            }
        };

        let eliminations = count("eliminations");
        let assists = count("assists");
        let deaths = count("deaths");
        let damage_dealt = count("damage_dealt");
        let healing_done = count("healing_done");
        let damage_mitigated = count("damage_mitigated");
        let won = count("result") != 0;

        PlayerRound {
            nickname,
            match_id,
            round_index,
            role,
            eliminations,
            assists,
            deaths,
            // Upstream K/D is unreliable; always recompute.
            kd_ratio: kd_ratio(eliminations, deaths),
            damage_dealt,
            healing_done,
            damage_mitigated,
            won,
            mode,
            map,
            duration: None,
            per_10: None,
            value: None,
        }
    }
}

/// Rename upstream stat keys to canonical column names. Keys already in
/// canonical form pass through; unmapped keys are discarded.
fn canonical_columns(stats: Map<String, Value>) -> BTreeMap<&'static str, Value> {
    let mut columns = BTreeMap::new();
    for (key, value) in stats {
        let canonical = COLUMN_MAPPING
            .iter()
            .find(|(upstream, canonical)| key == *upstream || key == *canonical)
            .map(|(_, canonical)| *canonical);
        if let Some(column) = canonical {
            columns.insert(column, value);
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::RawMatchPayload;
    use crate::pipeline::fixtures::{match_record, player_round};
    use crate::pipeline::telemetry::RecordingTelemetry;
    use serde_json::json;

    #[test]
    fn test_kd_ratio_handles_zero_deaths() {
        assert_eq!(kd_ratio(7, 0), 7.0);
        assert_eq!(kd_ratio(9, 3), 3.0);
    }

    #[test]
    fn test_declared_duration_is_ninety_percent() {
        let record = match_record("m");
        assert_eq!(record.declared_duration(), Some(3600.0));

        let mut missing = record.clone();
        missing.started_at = None;
        assert_eq!(missing.declared_duration(), None);
    }

    #[test]
    fn test_adjusted_round_points() {
        // Control doubles (2+1)*2 = 6; Hybrid adds one per faction (1+1)+(2+1) = 5.
        assert_eq!(match_record("m").adjusted_round_points(), vec![6.0, 5.0]);
    }

    #[test]
    fn test_rounds_consistent() {
        let mut record = match_record("m");
        assert!(record.rounds_consistent());
        record.faction_2_map_scores.pop();
        assert!(!record.rounds_consistent());

        let mut empty = match_record("m");
        empty.maps.clear();
        empty.map_types.clear();
        empty.faction_1_map_scores.clear();
        empty.faction_2_map_scores.clear();
        assert!(!empty.rounds_consistent());
    }

    #[test]
    fn test_missing_fields_lists_nulls() {
        let mut record = match_record("m");
        assert!(record.missing_fields().is_empty());
        record.started_at = None;
        record.winner = None;
        assert_eq!(record.missing_fields(), vec!["started_at", "winner"]);
    }

    #[test]
    fn test_drop_match_keeps_tables_joined() {
        let mut tables = Tables::new(vec![match_record("a"), match_record("b")], vec![]);
        for (id, nick) in [("a", "x"), ("a", "y"), ("b", "x")] {
            tables.players.push(player_round(nick, id, 0, "Control"));
        }

        assert_eq!(tables.drop_match(&MatchId::new("a")), 2);
        assert_eq!(tables.matches.len(), 1);
        assert_eq!(tables.players.len(), 1);
        assert_eq!(tables.player_rows("x").count(), 1);
    }

    #[test]
    fn test_builder_remaps_and_backfills() {
        let telemetry = RecordingTelemetry::new();
        let mut extractor = Extractor::new(telemetry.clone());
        let mut builder = TableBuilder::new(telemetry.clone());
        let mut report = BatchReport::default();

        extractor.add_data(RawMatchPayload::new(
            json!({"match_id": "m1"}),
            json!({"rounds": [{
                "match_id": "m1",
                "round_stats": {"OW2 Mode": "Control", "Map": "Busan"},
                "teams": [{"players": [{
                    "nickname": "kiriko",
                    "player_stats": {
                        "Role": "Support",
                        "Eliminations": "6",
                        "Assists": "12",
                        "Deaths": "3",
                        "K/D Ratio": "99",
                        "Damage Dealt": "4200",
                        "Healing Done": "9000",
                        "Result": "1",
                        "Ultimates Used": "3"
                    }
                }]}]
            }]}),
        ));
        extractor.extract_all(&mut report);
        builder.commit(&mut extractor, &mut report);

        let tables = builder.finish();
        assert_eq!(tables.players.len(), 1);
        let row = &tables.players[0];
        assert_eq!(row.role, Role::Support);
        assert_eq!(row.eliminations, 6);
        assert_eq!(row.kd_ratio, 2.0);
        assert_eq!(row.damage_mitigated, 0);
        assert!(row.won);

        // Only "Damage Mitigated" was absent.
        assert_eq!(report.backfilled_columns, 1);
        assert_eq!(
            telemetry.count(|e| matches!(
                e,
                PipelineEvent::ColumnBackfilled { column: "damage_mitigated", .. }
            )),
            1
        );
    }

    #[test]
    fn test_builder_ignores_repeated_match() {
        let telemetry = RecordingTelemetry::new();
        let mut extractor = Extractor::new(telemetry.clone());
        let mut builder = TableBuilder::new(telemetry);
        let mut report = BatchReport::default();
        let stats = json!({"rounds": [{
            "match_id": "m1",
            "teams": [{"players": [{"nickname": "a", "player_stats": {}}]}]
        }]});

        for _ in 0..2 {
            extractor.add_data(RawMatchPayload::new(json!({"match_id": "m1"}), stats.clone()));
            extractor.extract_all(&mut report);
            builder.commit(&mut extractor, &mut report);
        }

        assert_eq!(report.duplicate_matches, 1);
        assert_eq!(builder.tables().players.len(), 1);
    }

    fn one_player_stats(match_id: &str) -> serde_json::Value {
        json!({"rounds": [{
            "match_id": match_id,
            "teams": [{"players": [{"nickname": "a", "player_stats": {}}]}]
        }]})
    }

    #[test]
    fn test_first_payload_wins_within_one_commit() {
        let telemetry = RecordingTelemetry::new();
        let mut extractor = Extractor::new(telemetry.clone());
        let mut builder = TableBuilder::new(telemetry);
        let mut report = BatchReport::default();

        for _ in 0..2 {
            extractor.add_data(RawMatchPayload::new(
                json!({"match_id": "m1"}),
                one_player_stats("m1"),
            ));
        }
        extractor.extract_all(&mut report);
        builder.commit(&mut extractor, &mut report);

        assert_eq!(report.duplicate_matches, 1);
        assert_eq!(builder.tables().matches.len(), 1);
        assert_eq!(builder.tables().players.len(), 1);
    }

    #[test]
    fn test_repeat_without_details_does_not_add_rows() {
        let telemetry = RecordingTelemetry::new();
        let mut extractor = Extractor::new(telemetry.clone());
        let mut builder = TableBuilder::new(telemetry);
        let mut report = BatchReport::default();

        extractor.add_data(RawMatchPayload::new(
            json!({"match_id": "m1"}),
            one_player_stats("m1"),
        ));
        extractor.add_data(RawMatchPayload::new(
            serde_json::Value::Null,
            one_player_stats("m1"),
        ));
        extractor.extract_all(&mut report);
        builder.commit(&mut extractor, &mut report);

        assert_eq!(report.duplicate_matches, 1);
        assert_eq!(builder.tables().players.len(), 1);
    }

    #[test]
    fn test_declared_duration_overflow_is_none() {
        let mut record = match_record("m");
        record.started_at = Some(i64::MIN);
        record.finished_at = Some(i64::MAX);
        assert_eq!(record.declared_duration(), None);
    }
}
