//! Telemetry collaborator handed to each pipeline component at construction.
//!
//! Components report typed events rather than writing log lines themselves, so
//! the binary can route them to `tracing` while tests capture them in memory.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::report::{DropReason, ExtractFailure, PayloadKind};
use crate::cli::types::MatchId;

/// Pipeline stage names used in `StageFinished` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Build,
    Completeness,
    Plausibility,
    Allocate,
    Metrics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Extracted {
        kind: PayloadKind,
        match_id: Option<MatchId>,
        records: usize,
    },
    ExtractionFailed {
        kind: PayloadKind,
        match_id: Option<MatchId>,
        failure: ExtractFailure,
    },
    PlayerSkipped {
        match_id: Option<MatchId>,
        reason: &'static str,
    },
    DuplicateMatch {
        match_id: MatchId,
    },
    ColumnBackfilled {
        nickname: String,
        match_id: MatchId,
        column: &'static str,
    },
    MatchDropped {
        match_id: MatchId,
        reason: DropReason,
        player_rows: usize,
        detail: String,
    },
    StageFinished {
        stage: Stage,
        matches: usize,
        players: usize,
    },
}

pub trait Telemetry: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// Shared handle components hold on to.
pub type SharedTelemetry = Arc<dyn Telemetry>;

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    pub fn shared() -> SharedTelemetry {
        Arc::new(Self)
    }
}

impl Telemetry for TracingTelemetry {
    fn record(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Extracted {
                kind,
                match_id,
                records,
            } => debug!(%kind, match_id = ?match_id, records, "payload extracted"),
            PipelineEvent::ExtractionFailed {
                kind,
                match_id,
                failure,
            } => warn!(%kind, match_id = ?match_id, %failure, "extraction failed"),
            PipelineEvent::PlayerSkipped { match_id, reason } => {
                warn!(match_id = ?match_id, reason, "player entry skipped")
            }
            PipelineEvent::DuplicateMatch { match_id } => {
                warn!(%match_id, "match already in batch, ignoring repeat")
            }
            PipelineEvent::ColumnBackfilled {
                nickname,
                match_id,
                column,
            } => warn!(%nickname, %match_id, column, "missing column, backfilled with default"),
            PipelineEvent::MatchDropped {
                match_id,
                reason,
                player_rows,
                detail,
            } => warn!(%match_id, %reason, player_rows, %detail, "match dropped"),
            PipelineEvent::StageFinished {
                stage,
                matches,
                players,
            } => info!(stage = ?stage, matches, players, "stage finished"),
        }
    }
}

/// Keeps every event in memory; used by tests and by callers that want to
/// inspect a run after the fact.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_telemetry_keeps_order() {
        let telemetry = RecordingTelemetry::new();
        telemetry.record(PipelineEvent::DuplicateMatch {
            match_id: MatchId::new("a"),
        });
        telemetry.record(PipelineEvent::StageFinished {
            stage: Stage::Build,
            matches: 1,
            players: 10,
        });

        let events = telemetry.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], PipelineEvent::DuplicateMatch { .. }));
        assert_eq!(
            telemetry.count(|e| matches!(e, PipelineEvent::StageFinished { .. })),
            1
        );
    }

    #[test]
    fn test_tracing_telemetry_accepts_every_event() {
        // No subscriber installed; this only checks nothing panics.
        let telemetry = TracingTelemetry::shared();
        telemetry.record(PipelineEvent::ExtractionFailed {
            kind: PayloadKind::Details,
            match_id: None,
            failure: ExtractFailure::Empty,
        });
        telemetry.record(PipelineEvent::MatchDropped {
            match_id: MatchId::new("a"),
            reason: DropReason::Defect,
            player_rows: 3,
            detail: "zero duration".to_string(),
        });
    }
}
