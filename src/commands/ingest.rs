//! Ingest command: championship download, pipeline run and storage.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    cli::types::{ChampionshipId, MatchId},
    core::cache::{default_cache_dir, PayloadCache, PayloadCacheKey, DEFAULT_MEMORY_CAPACITY},
    faceit::{ClientConfig, FaceitClient},
    pipeline::{PayloadKind, Pipeline, PipelineConfig, RawMatchPayload, TracingTelemetry},
    Result,
};

use super::common::{open_database, persist, resolve_api_key, RunSummary};

pub struct IngestParams {
    pub championship: ChampionshipId,
    pub api_key: Option<String>,
    pub refresh: bool,
    pub limit: Option<usize>,
    pub config: PipelineConfig,
    pub db: Option<PathBuf>,
    pub dry_run: bool,
    pub as_json: bool,
}

/// Payloads collected for one championship.
#[derive(Debug, Default)]
pub struct Downloaded {
    pub payloads: Vec<RawMatchPayload>,
    /// Requests that failed; the payload is passed on as absent.
    pub failed_requests: usize,
    /// Matches skipped because their stats repeated the previous match's.
    pub stale_stats_skipped: usize,
}

/// Handle the ingest command
pub async fn handle_ingest(params: IngestParams) -> Result<()> {
    let api_key = resolve_api_key(params.api_key)?;
    let client = FaceitClient::new(&api_key, ClientConfig::default())?;
    let cache = PayloadCache::new(default_cache_dir(), DEFAULT_MEMORY_CAPACITY);

    println!("Listing matches of championship {}...", params.championship);
    let mut match_ids = client.championship_match_ids(&params.championship).await?;
    if let Some(limit) = params.limit {
        match_ids.truncate(limit);
    }
    println!("✓ {} matches found", match_ids.len());

    let downloaded = download_matches(&client, &cache, &match_ids, params.refresh).await;

    let pipeline = Pipeline::new(params.config, TracingTelemetry::shared());
    let output = pipeline.run(downloaded.payloads);

    let mut summary = RunSummary::from_report(&output.report);
    summary.failed_requests = downloaded.failed_requests;
    summary.stale_stats_skipped = downloaded.stale_stats_skipped;

    let mut db = open_database(params.db, params.dry_run)?;
    let (matches, players) = persist(&mut db, &output.tables)?;
    if !params.dry_run {
        summary.matches_written = matches;
        summary.players_written = players;
    }

    summary.print(params.as_json)
}

/// Fetch details and stats for each match, reading through the payload cache.
///
/// Request failures never abort the run: the payload is passed on as `null`
/// and the extractor reports it. A stats payload identical to the previous
/// match's is a stale upstream response and the match is skipped.
pub async fn download_matches(
    client: &FaceitClient,
    cache: &PayloadCache,
    match_ids: &[MatchId],
    refresh: bool,
) -> Downloaded {
    let mut downloaded = Downloaded::default();
    let mut previous_stats: Option<Value> = None;

    for (n, match_id) in match_ids.iter().enumerate() {
        let details = fetch_payload(client, cache, match_id, PayloadKind::Details, refresh).await;
        let stats = fetch_payload(client, cache, match_id, PayloadKind::Stats, refresh).await;
        let (details, stats) = match (details, stats) {
            (Some(d), Some(s)) => (d, s),
            (d, s) => {
                downloaded.failed_requests += usize::from(d.is_none()) + usize::from(s.is_none());
                (d.unwrap_or(Value::Null), s.unwrap_or(Value::Null))
            }
        };

        if !stats.is_null() && previous_stats.as_ref() == Some(&stats) {
            warn!(%match_id, "stats identical to previous match, skipping");
            downloaded.stale_stats_skipped += 1;
            continue;
        }
        if !stats.is_null() {
            previous_stats = Some(stats.clone());
        }

        downloaded.payloads.push(RawMatchPayload::new(details, stats));
        if (n + 1) % 25 == 0 {
            info!(downloaded = n + 1, total = match_ids.len(), "download progress");
        }
    }

    downloaded
}

async fn fetch_payload(
    client: &FaceitClient,
    cache: &PayloadCache,
    match_id: &MatchId,
    kind: PayloadKind,
    refresh: bool,
) -> Option<Value> {
    let key = PayloadCacheKey {
        match_id: match_id.clone(),
        kind,
    };
    if !refresh {
        if let Some(cached) = cache.get(&key) {
            return Some(cached);
        }
    }

    let fetched = match kind {
        PayloadKind::Details => client.match_details(match_id).await,
        PayloadKind::Stats => client.match_stats(match_id).await,
    };
    match fetched {
        Ok(value) => {
            cache.put(key, value.clone());
            Some(value)
        }
        Err(err) => {
            warn!(%match_id, %kind, error = %err, "request failed");
            None
        }
    }
}
