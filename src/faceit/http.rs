//! Rate-limited client for the FACEIT Data API v4.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::cli::types::{ChampionshipId, MatchId};
use crate::error::{PipelineError, Result};


/// Base path of the FACEIT Data API.
pub const FACEIT_BASE_URL: &str = "https://open.faceit.com/data/v4";

/// Largest page the championship listing accepts.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub page_size: usize,
    /// Minimum gap between the start of two successive requests.
    pub min_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: FACEIT_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            min_delay: Duration::from_secs(2),
        }
    }
}

pub struct FaceitClient {
    client: Client,
    headers: HeaderMap,
    config: ClientConfig,
    last_request: Mutex<Option<Instant>>,
}

impl FaceitClient {
    pub fn new(api_key: &str, config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))?,
        );

        Ok(Self {
            client: Client::new(),
            headers,
            config,
            last_request: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sleep until `min_delay` has passed since the previous request.
    async fn throttle(&self) {
        let wait = {
            let mut last = self
                .last_request
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let wait = last
                .map(|at| self.config.min_delay.saturating_sub(now.duration_since(at)))
                .unwrap_or_default();
            *last = Some(now + wait);
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.throttle().await;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(%url, "GET");

        let res = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(res)
    }

    /// Every match id of a championship, in the order first listed.
    ///
    /// Pages are requested until one adds no id not already seen; the offset
    /// advances by the number of new ids.
    pub async fn championship_match_ids(&self, championship: &ChampionshipId) -> Result<Vec<MatchId>> {
        let path = format!("championships/{}/matches", championship.as_str());
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut offset = 0usize;

        loop {
            let page = self
                .get_json(
                    &path,
                    &[
                        ("offset", offset.to_string()),
                        ("limit", self.config.page_size.to_string()),
                    ],
                )
                .await?;

            let Some(items) = page.get("items").and_then(Value::as_array) else {
                return Err(PipelineError::NoData);
            };

            let mut new_ids = 0;
            for id in items
                .iter()
                .filter_map(|item| item.get("match_id").and_then(Value::as_str))
            {
                if seen.insert(id.to_string()) {
                    ids.push(MatchId::new(id));
                    new_ids += 1;
                }
            }

            if new_ids == 0 {
                break;
            }
            offset += new_ids;
            info!(championship = %championship, collected = ids.len(), "fetched match page");
        }

        Ok(ids)
    }

    pub async fn match_details(&self, match_id: &MatchId) -> Result<Value> {
        self.get_json(&format!("matches/{}", match_id.as_str()), &[])
            .await
    }

    pub async fn match_stats(&self, match_id: &MatchId) -> Result<Value> {
        self.get_json(&format!("matches/{}/stats", match_id.as_str()), &[])
            .await
    }
}
