//! Per-record outcomes and the batch-level summary they roll up into.

use std::collections::BTreeMap;
use std::fmt;

/// Which of the two upstream payloads a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PayloadKind {
    Details,
    Stats,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Details => write!(f, "details"),
            PayloadKind::Stats => write!(f, "stats"),
        }
    }
}

/// Why a raw payload produced no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtractFailure {
    Empty,
    NotAMapping,
    MissingKey(&'static str),
    WrongShape(&'static str),
}

impl fmt::Display for ExtractFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractFailure::Empty => write!(f, "payload was empty"),
            ExtractFailure::NotAMapping => write!(f, "payload was not a JSON object"),
            ExtractFailure::MissingKey(key) => write!(f, "missing key `{key}`"),
            ExtractFailure::WrongShape(key) => write!(f, "unexpected shape for `{key}`"),
        }
    }
}

/// Why a whole match (and every player row sharing its id) left the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    /// Player rows arrived for a match whose details could not be extracted.
    MissingDetails,
    /// A required match field was null.
    MissingFields,
    /// Maps, map types and the two per-round score lists disagree in length.
    InconsistentRounds,
    /// Declared duration too short for the points scored.
    ImplausibleDuration,
    /// A player's rows could not be lined up with the match's rounds.
    RoundMisalignment,
    /// An invariant an earlier stage should have guaranteed did not hold.
    Defect,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::MissingDetails => "missing details",
            DropReason::MissingFields => "missing fields",
            DropReason::InconsistentRounds => "inconsistent rounds",
            DropReason::ImplausibleDuration => "implausible duration",
            DropReason::RoundMisalignment => "round misalignment",
            DropReason::Defect => "defect",
        };
        write!(f, "{}", s)
    }
}

/// Summary of one pipeline run: what came in, what survived and why the rest
/// did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub payloads_received: usize,
    pub extraction_failures: BTreeMap<(PayloadKind, ExtractFailure), usize>,
    pub skipped_player_entries: usize,
    pub duplicate_matches: usize,
    pub backfilled_columns: usize,
    pub dropped_matches: BTreeMap<DropReason, usize>,
    pub dropped_player_rows: usize,
    pub matches_out: usize,
    pub players_out: usize,
}

impl BatchReport {
    pub fn record_extraction_failure(&mut self, kind: PayloadKind, failure: ExtractFailure) {
        *self.extraction_failures.entry((kind, failure)).or_insert(0) += 1;
    }

    pub fn record_drop(&mut self, reason: DropReason, player_rows: usize) {
        *self.dropped_matches.entry(reason).or_insert(0) += 1;
        self.dropped_player_rows += player_rows;
    }

    pub fn dropped(&self, reason: DropReason) -> usize {
        self.dropped_matches.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped_matches.values().sum()
    }

    pub fn total_extraction_failures(&self) -> usize {
        self.extraction_failures.values().sum()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} payloads in, {} matches / {} player rows out",
            self.payloads_received, self.matches_out, self.players_out
        )?;
        for ((kind, failure), count) in &self.extraction_failures {
            writeln!(f, "  extraction failed ({kind}, {failure}): {count}")?;
        }
        if self.skipped_player_entries > 0 {
            writeln!(f, "  player entries skipped: {}", self.skipped_player_entries)?;
        }
        if self.duplicate_matches > 0 {
            writeln!(f, "  duplicate matches ignored: {}", self.duplicate_matches)?;
        }
        if self.backfilled_columns > 0 {
            writeln!(f, "  columns backfilled: {}", self.backfilled_columns)?;
        }
        for (reason, count) in &self.dropped_matches {
            writeln!(f, "  matches dropped ({reason}): {count}")?;
        }
        write!(f, "  player rows dropped: {}", self.dropped_player_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_drop_accumulates() {
        let mut report = BatchReport::default();
        report.record_drop(DropReason::MissingFields, 10);
        report.record_drop(DropReason::MissingFields, 5);
        report.record_drop(DropReason::ImplausibleDuration, 12);

        assert_eq!(report.dropped(DropReason::MissingFields), 2);
        assert_eq!(report.dropped(DropReason::Defect), 0);
        assert_eq!(report.total_dropped(), 3);
        assert_eq!(report.dropped_player_rows, 27);
    }

    #[test]
    fn test_display_lists_reasons() {
        let mut report = BatchReport::default();
        report.record_extraction_failure(PayloadKind::Stats, ExtractFailure::MissingKey("rounds"));
        report.record_drop(DropReason::InconsistentRounds, 3);

        let text = report.to_string();
        assert!(text.contains("missing key `rounds`"));
        assert!(text.contains("inconsistent rounds"));
    }
}
