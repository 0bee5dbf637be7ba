//! Flattening of raw FACEIT match payloads.
//!
//! Match details become one [`MatchRecord`] each; match stats become one
//! [`RawPlayerEntry`] per player per round. Malformed payloads never fail the
//! batch: they produce nothing for that match and are reported through
//! telemetry and the [`BatchReport`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::report::{BatchReport, ExtractFailure, PayloadKind};
use super::tables::MatchRecord;
use super::telemetry::{PipelineEvent, SharedTelemetry, Stage};
use crate::cli::types::MatchId;
use crate::faceit::maps::{map_name_for, map_type_for};

/// The pair of payloads fetched for one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMatchPayload {
    #[serde(default)]
    pub details: Value,
    #[serde(default)]
    pub stats: Value,
}

impl RawMatchPayload {
    pub fn new(details: Value, stats: Value) -> Self {
        Self { details, stats }
    }
}

/// One player's stats for one round, stamped with the round's context.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPlayerEntry {
    pub nickname: Option<String>,
    pub match_id: MatchId,
    pub round_index: usize,
    pub mode: String,
    pub map: String,
    pub player_stats: Map<String, Value>,
}

/// What one payload pair produced. Either half may be missing when its
/// payload failed to extract.
#[derive(Debug, Default)]
pub struct ExtractedMatch {
    pub details: Option<MatchRecord>,
    pub players: Vec<RawPlayerEntry>,
}

impl ExtractedMatch {
    /// The match this payload belongs to: the details id, or the id stamped
    /// on its first player entry when the details are missing.
    pub fn match_id(&self) -> Option<&MatchId> {
        self.details
            .as_ref()
            .map(|d| &d.match_id)
            .or_else(|| self.players.first().map(|p| &p.match_id))
    }
}

/// Extractor output waiting to be committed by the table builder, one entry
/// per payload in arrival order.
#[derive(Debug, Default)]
pub struct ExtractedBatch {
    pub matches: Vec<ExtractedMatch>,
}

impl ExtractedBatch {
    pub fn details_count(&self) -> usize {
        self.matches.iter().filter(|m| m.details.is_some()).count()
    }

    pub fn player_count(&self) -> usize {
        self.matches.iter().map(|m| m.players.len()).sum()
    }
}

/// Buffers raw payloads and flattens them on demand.
pub struct Extractor {
    telemetry: SharedTelemetry,
    pending: Vec<RawMatchPayload>,
    extracted: ExtractedBatch,
}

impl Extractor {
    pub fn new(telemetry: SharedTelemetry) -> Self {
        Self {
            telemetry,
            pending: Vec::new(),
            extracted: ExtractedBatch::default(),
        }
    }

    /// Queue one match's payloads for extraction.
    pub fn add_data(&mut self, payload: RawMatchPayload) {
        self.pending.push(payload);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Flatten every queued payload into the transient buffers.
    pub fn extract_all(&mut self, report: &mut BatchReport) {
        let pending = std::mem::take(&mut self.pending);
        report.payloads_received += pending.len();

        for payload in pending {
            let details = self.extract_details(&payload.details, report);
            let fallback_id = details.as_ref().map(|d| d.match_id.clone());
            let players = self.extract_stats(&payload.stats, fallback_id.as_ref(), report);

            if details.is_some() || !players.is_empty() {
                self.extracted.matches.push(ExtractedMatch { details, players });
            }
        }

        self.telemetry.record(PipelineEvent::StageFinished {
            stage: Stage::Extract,
            matches: self.extracted.details_count(),
            players: self.extracted.player_count(),
        });
    }

    /// Hand over everything extracted so far, leaving the buffers empty.
    pub fn drain(&mut self) -> ExtractedBatch {
        std::mem::take(&mut self.extracted)
    }

    fn fail(
        &self,
        report: &mut BatchReport,
        kind: PayloadKind,
        match_id: Option<MatchId>,
        failure: ExtractFailure,
    ) {
        report.record_extraction_failure(kind, failure);
        self.telemetry.record(PipelineEvent::ExtractionFailed {
            kind,
            match_id,
            failure,
        });
    }

    fn extract_details(&self, payload: &Value, report: &mut BatchReport) -> Option<MatchRecord> {
        match details_from_value(payload) {
            Ok(record) => {
                self.telemetry.record(PipelineEvent::Extracted {
                    kind: PayloadKind::Details,
                    match_id: Some(record.match_id.clone()),
                    records: 1,
                });
                Some(record)
            }
            Err(failure) => {
                self.fail(report, PayloadKind::Details, None, failure);
                None
            }
        }
    }

    fn extract_stats(
        &self,
        payload: &Value,
        fallback_id: Option<&MatchId>,
        report: &mut BatchReport,
    ) -> Vec<RawPlayerEntry> {
        match players_from_value(payload, fallback_id) {
            Ok((players, skipped)) => {
                for _ in 0..skipped {
                    report.skipped_player_entries += 1;
                    self.telemetry.record(PipelineEvent::PlayerSkipped {
                        match_id: fallback_id.cloned(),
                        reason: "no nickname",
                    });
                }
                self.telemetry.record(PipelineEvent::Extracted {
                    kind: PayloadKind::Stats,
                    match_id: fallback_id.cloned(),
                    records: players.len(),
                });
                players
            }
            Err(failure) => {
                self.fail(report, PayloadKind::Stats, fallback_id.cloned(), failure);
                Vec::new()
            }
        }
    }
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, ExtractFailure> {
    match payload {
        Value::Null => Err(ExtractFailure::Empty),
        Value::Object(map) if map.is_empty() => Err(ExtractFailure::Empty),
        Value::Object(map) => Ok(map),
        Value::Array(items) if items.is_empty() => Err(ExtractFailure::Empty),
        _ => Err(ExtractFailure::NotAMapping),
    }
}

/// Read a value as text. Numbers are rendered, everything else is `None`.
pub(crate) fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a value as an integer, accepting numeric strings such as `"12"` or `"12.0"`.
pub(crate) fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn pointer_text(root: &Value, pointer: &str) -> Option<String> {
    root.pointer(pointer).and_then(value_to_text)
}

fn pointer_i64(root: &Value, pointer: &str) -> Option<i64> {
    root.pointer(pointer).and_then(value_to_i64)
}

/// Flatten a match-details payload. Only a missing match id fails the record;
/// every other missing key becomes `None` or an empty list.
pub fn details_from_value(payload: &Value) -> Result<MatchRecord, ExtractFailure> {
    let map = as_object(payload)?;
    let match_id = map
        .get("match_id")
        .and_then(value_to_text)
        .filter(|id| !id.is_empty())
        .ok_or(ExtractFailure::MissingKey("match_id"))?;

    let maps: Vec<String> = payload
        .pointer("/voting/map/pick")
        .and_then(Value::as_array)
        .map(|picks| picks.iter().filter_map(value_to_text).collect())
        .unwrap_or_default();
    let map_types = maps.iter().map(|id| map_type_for(id)).collect();
    let map_names = maps.iter().map(|id| map_name_for(id).to_string()).collect();

    let detailed: &[Value] = payload
        .get("detailed_results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    Ok(MatchRecord {
        match_id: MatchId::new(match_id),
        competition_type: pointer_text(payload, "/competition_type"),
        competition_id: pointer_text(payload, "/competition_id"),
        competition_name: pointer_text(payload, "/competition_name"),
        started_at: pointer_i64(payload, "/started_at"),
        finished_at: pointer_i64(payload, "/finished_at"),
        winner: pointer_text(payload, "/results/winner"),
        faction_1: pointer_text(payload, "/teams/faction1/name"),
        faction_2: pointer_text(payload, "/teams/faction2/name"),
        faction_1_score: pointer_i64(payload, "/results/score/faction1"),
        faction_2_score: pointer_i64(payload, "/results/score/faction2"),
        maps,
        map_types,
        map_names,
        faction_1_map_scores: detailed
            .iter()
            .map(|r| pointer_i64(r, "/factions/faction1/score").unwrap_or(0))
            .collect(),
        faction_2_map_scores: detailed
            .iter()
            .map(|r| pointer_i64(r, "/factions/faction2/score").unwrap_or(0))
            .collect(),
        map_winner: detailed
            .iter()
            .map(|r| r.get("winner").and_then(value_to_text))
            .collect(),
    })
}

/// Flatten a match-stats payload into per-round player entries.
///
/// Returns the entries and the number of player objects skipped for lacking a
/// nickname.
pub fn players_from_value(
    payload: &Value,
    fallback_id: Option<&MatchId>,
) -> Result<(Vec<RawPlayerEntry>, usize), ExtractFailure> {
    let map = as_object(payload)?;
    let rounds = map
        .get("rounds")
        .ok_or(ExtractFailure::MissingKey("rounds"))?
        .as_array()
        .ok_or(ExtractFailure::WrongShape("rounds"))?;

    let mut entries = Vec::new();
    let mut skipped = 0;

    for (round_index, round) in rounds.iter().enumerate() {
        let mode = pointer_text(round, "/round_stats/OW2 Mode").unwrap_or_else(|| "Unknown".into());
        let round_map = pointer_text(round, "/round_stats/Map").unwrap_or_else(|| "Unknown".into());
        let match_id = round
            .get("match_id")
            .and_then(value_to_text)
            .map(MatchId::new)
            .or_else(|| fallback_id.cloned())
            .ok_or(ExtractFailure::MissingKey("match_id"))?;

        let teams = round.get("teams").and_then(Value::as_array);
        for team in teams.into_iter().flatten() {
            let players = team.get("players").and_then(Value::as_array);
            for player in players.into_iter().flatten() {
                let nickname = player.get("nickname").and_then(value_to_text);
                if nickname.is_none() {
                    skipped += 1;
                    continue;
                }
                entries.push(RawPlayerEntry {
                    nickname,
                    match_id: match_id.clone(),
                    round_index,
                    mode: mode.clone(),
                    map: round_map.clone(),
                    player_stats: player
                        .get("player_stats")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default(),
                });
            }
        }
    }

    Ok((entries, skipped))
}
