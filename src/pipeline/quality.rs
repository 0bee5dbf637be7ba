//! Data-quality filters. Both work on whole matches: a failing match id is
//! removed from the matches table and from the players table together.

use super::report::{BatchReport, DropReason};
use super::tables::Tables;
use super::telemetry::{PipelineEvent, SharedTelemetry, Stage};
use crate::cli::types::MatchId;

/// Minimum playing time per adjusted point, in seconds.
pub const DEFAULT_SECONDS_PER_POINT: f64 = 120.0;

pub struct QualityFilter {
    telemetry: SharedTelemetry,
    seconds_per_point: f64,
}

impl QualityFilter {
    pub fn new(seconds_per_point: f64, telemetry: SharedTelemetry) -> Self {
        Self {
            telemetry,
            seconds_per_point,
        }
    }

    /// Drop matches with null required fields or mismatched per-round lists,
    /// and player rows whose match has no details at all.
    pub fn completeness(&self, mut tables: Tables, report: &mut BatchReport) -> Tables {
        let mut failing: Vec<(MatchId, DropReason, String)> = Vec::new();

        for (match_id, record) in &tables.matches {
            let missing = record.missing_fields();
            if !missing.is_empty() {
                failing.push((
                    match_id.clone(),
                    DropReason::MissingFields,
                    format!("null fields: {}", missing.join(", ")),
                ));
            } else if !record.rounds_consistent() {
                failing.push((
                    match_id.clone(),
                    DropReason::InconsistentRounds,
                    format!(
                        "{} maps, {} map types, {}/{} round scores",
                        record.maps.len(),
                        record.map_types.len(),
                        record.faction_1_map_scores.len(),
                        record.faction_2_map_scores.len()
                    ),
                ));
            }
        }

        for match_id in tables.player_match_ids() {
            if !tables.matches.contains_key(&match_id) {
                failing.push((
                    match_id,
                    DropReason::MissingDetails,
                    "player rows without match details".to_string(),
                ));
            }
        }

        self.drop_all(&mut tables, failing, report);
        self.finished(Stage::Completeness, &tables);
        tables
    }

    /// Drop matches whose declared duration does not exceed
    /// `seconds_per_point` times the adjusted points scored, including matches
    /// with no adjusted points at all.
    pub fn plausibility(&self, mut tables: Tables, report: &mut BatchReport) -> Tables {
        let mut failing = Vec::new();

        for (match_id, record) in &tables.matches {
            let points: f64 = record.adjusted_round_points().iter().sum();
            let Some(duration) = record.declared_duration() else {
                failing.push((
                    match_id.clone(),
                    DropReason::MissingFields,
                    "no usable start and finish time".to_string(),
                ));
                continue;
            };
            if points <= 0.0 || duration <= points * self.seconds_per_point {
                failing.push((
                    match_id.clone(),
                    DropReason::ImplausibleDuration,
                    format!("{duration:.0}s for {points} points"),
                ));
            }
        }

        self.drop_all(&mut tables, failing, report);
        self.finished(Stage::Plausibility, &tables);
        tables
    }

    fn drop_all(
        &self,
        tables: &mut Tables,
        failing: Vec<(MatchId, DropReason, String)>,
        report: &mut BatchReport,
    ) {
        for (match_id, reason, detail) in failing {
            let player_rows = tables.drop_match(&match_id);
            report.record_drop(reason, player_rows);
            self.telemetry.record(PipelineEvent::MatchDropped {
                match_id,
                reason,
                player_rows,
                detail,
            });
        }
    }

    fn finished(&self, stage: Stage, tables: &Tables) {
        self.telemetry.record(PipelineEvent::StageFinished {
            stage,
            matches: tables.matches.len(),
            players: tables.players.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::types::MapType;
    use crate::pipeline::fixtures::{match_record, player_round};
    use crate::pipeline::telemetry::RecordingTelemetry;

    fn filter() -> QualityFilter {
        QualityFilter::new(DEFAULT_SECONDS_PER_POINT, RecordingTelemetry::new())
    }

    fn two_match_tables() -> Tables {
        let mut tables = Tables::new(vec![match_record("a"), match_record("b")], vec![]);
        for id in ["a", "b"] {
            for nick in ["p1", "p2"] {
                tables.players.push(player_round(nick, id, 0, "Control"));
                tables.players.push(player_round(nick, id, 1, "Hybrid"));
            }
        }
        tables
    }

    #[test]
    fn test_null_started_at_drops_only_that_match() {
        let mut tables = two_match_tables();
        tables.matches.get_mut(&MatchId::new("a")).unwrap().started_at = None;
        let mut report = BatchReport::default();

        let tables = filter().completeness(tables, &mut report);

        assert!(!tables.matches.contains_key(&MatchId::new("a")));
        assert!(tables.players.iter().all(|p| p.match_id == MatchId::new("b")));
        assert_eq!(tables.players.len(), 4);
        assert_eq!(report.dropped(DropReason::MissingFields), 1);
        assert_eq!(report.dropped_player_rows, 4);
    }

    #[test]
    fn test_length_mismatch_is_dropped() {
        let mut tables = two_match_tables();
        tables
            .matches
            .get_mut(&MatchId::new("b"))
            .unwrap()
            .map_types
            .pop();
        let mut report = BatchReport::default();

        let tables = filter().completeness(tables, &mut report);

        assert_eq!(tables.matches.len(), 1);
        assert_eq!(report.dropped(DropReason::InconsistentRounds), 1);
    }

    #[test]
    fn test_orphan_player_rows_are_dropped() {
        let mut tables = two_match_tables();
        tables.players.push(player_round("p9", "ghost", 0, "Escort"));
        let mut report = BatchReport::default();

        let tables = filter().completeness(tables, &mut report);

        assert_eq!(tables.players.len(), 8);
        assert_eq!(report.dropped(DropReason::MissingDetails), 1);
        assert_eq!(report.dropped_player_rows, 1);
    }

    #[test]
    fn test_plausibility_threshold() {
        // Fixture has 11 adjusted points: threshold is 1320 s of playing time.
        let mut tables = two_match_tables();
        {
            let short = tables.matches.get_mut(&MatchId::new("a")).unwrap();
            // 1400 s wall clock -> 1260 s playing time.
            short.finished_at = Some(1400);
        }
        let mut report = BatchReport::default();

        let tables = filter().plausibility(tables, &mut report);

        assert_eq!(tables.matches.len(), 1);
        assert!(tables.matches.contains_key(&MatchId::new("b")));
        assert_eq!(report.dropped(DropReason::ImplausibleDuration), 1);
        assert_eq!(report.dropped_player_rows, 4);
    }

    #[test]
    fn test_plausibility_drops_scoreless_match() {
        let mut record = match_record("z");
        record.map_types = vec![MapType::Escort, MapType::Escort];
        record.faction_1_map_scores = vec![0, 0];
        record.faction_2_map_scores = vec![0, 0];
        let mut report = BatchReport::default();

        let tables = filter().plausibility(Tables::new(vec![record], vec![]), &mut report);

        assert!(tables.matches.is_empty());
        assert_eq!(report.dropped(DropReason::ImplausibleDuration), 1);
    }
}
