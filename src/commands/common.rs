//! Helpers shared by the command handlers: environment resolution, sink
//! handling and the run summary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use crate::{
    pipeline::{BatchReport, Tables},
    storage::{MatchDatabase, Sink},
    PipelineError, Result, API_KEY_ENV_VAR, DATABASE_ENV_VAR,
};

/// Attempts made to write the tables before giving up.
pub const SINK_ATTEMPTS: usize = 2;

/// Use the explicit key, else `FACEIT_API_KEY`.
pub fn resolve_api_key(api_key: Option<String>) -> Result<String> {
    api_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            std::env::var(API_KEY_ENV_VAR)
                .ok()
                .filter(|k| !k.trim().is_empty())
        })
        .ok_or_else(|| PipelineError::MissingApiKey {
            env_var: API_KEY_ENV_VAR.to_string(),
        })
}

/// Use the explicit path, else `FACEIT_OW_DB`, else the default data path.
pub fn resolve_database_path(db: Option<PathBuf>) -> Result<PathBuf> {
    match db.or_else(|| std::env::var_os(DATABASE_ENV_VAR).map(PathBuf::from)) {
        Some(path) => Ok(path),
        None => MatchDatabase::default_path(),
    }
}

/// Open the database, or an in-memory one for dry runs.
pub fn open_database(db: Option<PathBuf>, dry_run: bool) -> Result<MatchDatabase> {
    if dry_run {
        return MatchDatabase::open_in_memory();
    }
    MatchDatabase::open(&resolve_database_path(db)?)
}

/// Write both tables, retrying storage failures. The tables are borrowed, so
/// a failed write never loses computed results.
pub fn persist(sink: &mut dyn Sink, tables: &Tables) -> Result<(usize, usize)> {
    let mut attempt = 1;
    loop {
        match sink.write_tables(tables) {
            Ok(written) => return Ok(written),
            Err(err) if err.is_storage() && attempt < SINK_ATTEMPTS => {
                warn!(attempt, error = %err, "writing tables failed, retrying");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// What a command did, for printing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub payloads: usize,
    pub failed_requests: usize,
    pub stale_stats_skipped: usize,
    pub extraction_failures: usize,
    pub skipped_player_entries: usize,
    pub duplicate_matches: usize,
    pub backfilled_columns: usize,
    pub dropped_matches: BTreeMap<String, usize>,
    pub dropped_player_rows: usize,
    pub matches_out: usize,
    pub players_out: usize,
    pub matches_written: usize,
    pub players_written: usize,
}

impl RunSummary {
    pub fn from_report(report: &BatchReport) -> Self {
        Self {
            payloads: report.payloads_received,
            extraction_failures: report.total_extraction_failures(),
            skipped_player_entries: report.skipped_player_entries,
            duplicate_matches: report.duplicate_matches,
            backfilled_columns: report.backfilled_columns,
            dropped_matches: report
                .dropped_matches
                .iter()
                .map(|(reason, count)| (reason.to_string(), *count))
                .collect(),
            dropped_player_rows: report.dropped_player_rows,
            matches_out: report.matches_out,
            players_out: report.players_out,
            ..Self::default()
        }
    }

    pub fn print(&self, as_json: bool) -> Result<()> {
        if as_json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }

        println!("Payloads received: {}", self.payloads);
        if self.failed_requests > 0 {
            println!("Failed requests: {}", self.failed_requests);
        }
        if self.stale_stats_skipped > 0 {
            println!("Stale stats skipped: {}", self.stale_stats_skipped);
        }
        println!("Extraction failures: {}", self.extraction_failures);
        println!("Columns backfilled: {}", self.backfilled_columns);
        for (reason, count) in &self.dropped_matches {
            println!("Dropped ({reason}): {count}");
        }
        println!(
            "✓ {} matches / {} player rounds processed",
            self.matches_out, self.players_out
        );
        if self.matches_written > 0 || self.players_written > 0 {
            println!(
                "✓ {} matches / {} player rounds written",
                self.matches_written, self.players_written
            );
        }
        Ok(())
    }
}
