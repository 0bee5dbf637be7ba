//! Normalisation and derived-metrics pipeline
//!
//! Stages run in a fixed order, each taking ownership of the tables and
//! handing them on:
//! - `extract`: raw payloads to flat records
//! - `tables`: flat records to the matches and players tables
//! - `quality`: completeness and plausibility filters
//! - `allocate`: round durations from points scored
//! - `metrics`: per-10 rates and the value score
//!
//! Bad matches are removed as a unit and counted in the [`BatchReport`]; the
//! batch itself never fails.

pub mod allocate;
pub mod extract;
pub mod metrics;
pub mod quality;
pub mod report;
pub mod tables;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod fixtures;

pub use extract::{Extractor, RawMatchPayload};
pub use report::{BatchReport, DropReason, ExtractFailure, PayloadKind};
pub use tables::{MatchRecord, Per10Stats, PlayerRound, TableBuilder, Tables};
pub use telemetry::{
    PipelineEvent, RecordingTelemetry, SharedTelemetry, Telemetry, TracingTelemetry,
};

use crate::cli::types::RoundSelection;
use allocate::Allocator;
use metrics::MetricsEngine;
use quality::{QualityFilter, DEFAULT_SECONDS_PER_POINT};

/// Tunables for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub round_selection: RoundSelection,
    pub seconds_per_point: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            round_selection: RoundSelection::default(),
            seconds_per_point: DEFAULT_SECONDS_PER_POINT,
        }
    }
}

/// Surviving rows and the account of everything that did not survive.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub tables: Tables,
    pub report: BatchReport,
}

pub struct Pipeline {
    config: PipelineConfig,
    telemetry: SharedTelemetry,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, telemetry: SharedTelemetry) -> Self {
        Self { config, telemetry }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over a batch of raw payloads.
    pub fn run(&self, payloads: impl IntoIterator<Item = RawMatchPayload>) -> PipelineOutput {
        let mut report = BatchReport::default();
        let mut extractor = Extractor::new(self.telemetry.clone());
        let mut builder = TableBuilder::new(self.telemetry.clone());

        for payload in payloads {
            extractor.add_data(payload);
            extractor.extract_all(&mut report);
            builder.commit(&mut extractor, &mut report);
        }

        let tables = self.prepare(builder.finish(), &mut report);
        PipelineOutput { tables, report }
    }

    /// Filter, allocate and score tables that were already built, e.g. tables
    /// reloaded from storage.
    pub fn prepare(&self, tables: Tables, report: &mut BatchReport) -> Tables {
        let quality = QualityFilter::new(self.config.seconds_per_point, self.telemetry.clone());
        let allocator = Allocator::new(self.config.round_selection, self.telemetry.clone());
        let metrics = MetricsEngine::new(self.telemetry.clone());

        let tables = quality.completeness(tables, report);
        let tables = quality.plausibility(tables, report);
        let tables = allocator.apply(tables, report);
        let tables = metrics.apply(tables, report);

        report.matches_out = tables.matches.len();
        report.players_out = tables.players.len();
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn details(id: &str, started_at: Value) -> Value {
        json!({
            "match_id": id,
            "competition_type": "championship",
            "competition_id": "c1",
            "competition_name": "Open",
            "started_at": started_at,
            "finished_at": 4000,
            "results": {"winner": "faction1", "score": {"faction1": 2, "faction2": 0}},
            "teams": {"faction1": {"name": "Alpha"}, "faction2": {"name": "Bravo"}},
            "voting": {"map": {"pick": ["0x0800000000000827", "0x0800000000000756"]}},
            "detailed_results": [
                {"factions": {"faction1": {"score": 3}, "faction2": {"score": 2}}, "winner": "faction1"},
                {"factions": {"faction1": {"score": 3}, "faction2": {"score": 1}}, "winner": "faction1"}
            ]
        })
    }

    fn stats(id: &str) -> Value {
        let player = |nick: &str| {
            json!({"nickname": nick, "player_stats": {
                "Role": "Damage", "Eliminations": "20", "Assists": "5", "Deaths": "6",
                "Damage Dealt": "9000", "Healing Done": "0", "Damage Mitigated": "0", "Result": "1"
            }})
        };
        json!({"rounds": [
            {"match_id": id, "round_stats": {"OW2 Mode": "Escort", "Map": "Circuit Royal"},
             "teams": [{"players": [player("a"), player("b")]}]},
            {"match_id": id, "round_stats": {"OW2 Mode": "Escort", "Map": "Junkertown"},
             "teams": [{"players": [player("a"), player("b")]}]}
        ]})
    }

    #[test]
    fn test_run_end_to_end() {
        let telemetry = RecordingTelemetry::new();
        let pipeline = Pipeline::new(PipelineConfig::default(), telemetry.clone());

        let output = pipeline.run(vec![
            RawMatchPayload::new(details("good", json!(0)), stats("good")),
            RawMatchPayload::new(details("no-start", Value::Null), stats("no-start")),
            RawMatchPayload::new(Value::Null, Value::Null),
        ]);

        assert_eq!(output.report.payloads_received, 3);
        assert_eq!(output.report.dropped(DropReason::MissingFields), 1);
        assert_eq!(output.report.matches_out, 1);
        assert_eq!(output.report.players_out, 4);

        // 3600 s split 5:4 over two Escort rounds.
        let total: f64 = output
            .tables
            .player_rows("a")
            .map(|p| p.duration.unwrap())
            .sum();
        assert!((total - 3600.0).abs() < 1e-6);
        assert!(output.tables.players.iter().all(|p| p.value.is_some()));
        assert!(telemetry.count(|e| matches!(e, PipelineEvent::MatchDropped { .. })) >= 1);
    }
}
