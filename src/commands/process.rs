//! Process command: run the pipeline offline over a payload file, or re-score
//! what is already stored.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    cli::types::MatchId,
    pipeline::{
        BatchReport, Pipeline, PipelineConfig, PipelineOutput, RawMatchPayload, TracingTelemetry,
    },
    storage::MatchDatabase,
    Result,
};

use super::common::{open_database, persist, RunSummary};

pub struct ProcessParams {
    pub input: Option<PathBuf>,
    pub config: PipelineConfig,
    pub db: Option<PathBuf>,
    pub dry_run: bool,
    pub as_json: bool,
}

/// Read a JSON array of `{"details": ..., "stats": ...}` objects.
pub fn load_payloads(path: &Path) -> anyhow::Result<Vec<RawMatchPayload>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading payload file {}", path.display()))?;
    let payloads = serde_json::from_str(&text)
        .with_context(|| format!("parsing payload file {}", path.display()))?;
    Ok(payloads)
}

/// Filter, allocate and score the stored tables again.
pub fn rescore_stored(db: &MatchDatabase, pipeline: &Pipeline) -> Result<PipelineOutput> {
    let tables = db.load_tables()?;
    let mut report = BatchReport::default();
    let tables = pipeline.prepare(tables, &mut report);
    Ok(PipelineOutput { tables, report })
}

/// Handle the process command
pub fn handle_process(params: ProcessParams) -> Result<()> {
    let pipeline = Pipeline::new(params.config, TracingTelemetry::shared());

    let (mut db, output) = match &params.input {
        Some(path) => {
            let payloads = load_payloads(path)?;
            println!("Processing {} payloads from {}", payloads.len(), path.display());
            let db = open_database(params.db, params.dry_run)?;
            (db, pipeline.run(payloads))
        }
        None => {
            // Re-scoring reads the stored tables even on a dry run.
            let db = open_database(params.db, false)?;
            println!("Re-scoring {} stored matches", db.match_count()?);
            let output = rescore_stored(&db, &pipeline)?;
            if params.dry_run {
                (MatchDatabase::open_in_memory()?, output)
            } else {
                let mut db = db;
                let dropped: Vec<MatchId> = db
                    .load_matches()?
                    .into_iter()
                    .map(|m| m.match_id)
                    .filter(|id| !output.tables.matches.contains_key(id))
                    .collect();
                db.delete_matches(&dropped)?;
                (db, output)
            }
        }
    };

    let mut summary = RunSummary::from_report(&output.report);
    let (matches, players) = persist(&mut db, &output.tables)?;
    if !params.dry_run {
        summary.matches_written = matches;
        summary.players_written = players;
    }

    summary.print(params.as_json)
}
