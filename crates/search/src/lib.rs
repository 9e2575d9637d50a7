//! Search Client (§4.B): a typed wrapper over the log-index backend.

pub mod query_builder;

use chrono::{Duration, Utc};
use recheckwatch_model::result::{FacetTerm, Hit, ResultSet};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("log-index backend transport failure: {0}")]
    Transient(#[from] reqwest::Error),
    #[error("log-index backend returned a malformed response: {0}")]
    Protocol(String),
}

/// Index-name template and connection settings for the log-index
/// backend.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    /// `strftime`-style template, e.g. `logstash-%Y.%m.%d`.
    pub index_template: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://logstash.example.org/elasticsearch".to_string(),
            index_template: "logstash-%Y.%m.%d".to_string(),
            timeout_secs: 60,
        }
    }
}

/// The single operation the readiness gate and classifier need from a
/// log-index backend, exposed as a trait so both can be driven against
/// a fake in tests without a live HTTP server.
#[async_trait::async_trait]
pub trait LogIndexBackend: Send + Sync {
    async fn search(&self, query: &Value, size: u32, recent: bool) -> Result<ResultSet, SearchError>;
}

/// Client for the log-index backend's search endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    config: SearchConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    took: u64,
    #[serde(default)]
    timed_out: bool,
    hits: RawHits,
    #[serde(default)]
    facets: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_source")]
    source: Value,
}

impl SearchClient {
    /// # Panics
    /// Panics if the HTTP client cannot be constructed.
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build search HTTP client");
        Self { config, client }
    }

    /// Today's index and, within an hour of midnight, yesterday's too —
    /// matching the source's rollover-boundary behaviour.
    fn recent_indexes(&self) -> Vec<String> {
        let now = Utc::now();
        let one_hour_ago = now - Duration::hours(1);
        let today = format_index(&self.config.index_template, now);
        let yesterday = format_index(&self.config.index_template, one_hour_ago);
        if yesterday == today {
            vec![today]
        } else {
            vec![today, yesterday]
        }
    }

    fn to_result_set(raw: RawResponse) -> ResultSet {
        let hits: Vec<Hit> = raw
            .hits
            .hits
            .into_iter()
            .map(|h| Hit::from_source(h.index, h.source))
            .collect();

        let mut result = ResultSet::new(hits);
        result.took_ms = raw.took;
        result.timed_out = raw.timed_out;

        if let Some(facets) = raw.facets {
            if let Some(terms) = facets
                .get("tag")
                .and_then(|tag| tag.get("terms"))
                .and_then(Value::as_array)
            {
                result.terms = terms
                    .iter()
                    .filter_map(|t| {
                        let term = t.get("term")?.as_str()?.to_string();
                        let count = t.get("count").and_then(Value::as_u64).unwrap_or(0);
                        Some(FacetTerm { term, count })
                    })
                    .collect();
            }
        }

        result
    }
}

#[async_trait::async_trait]
impl LogIndexBackend for SearchClient {
    /// Issue `query` against the backend.
    ///
    /// `recent=true` restricts the search to the index (or two
    /// indexes, if we're within the last hour of one rolling over)
    /// covering "now". Indexes that don't exist yet are silently
    /// omitted by the backend.
    async fn search(
        &self,
        query: &Value,
        size: u32,
        recent: bool,
    ) -> Result<ResultSet, SearchError> {
        let url = format!("{}/_search", self.config.base_url.trim_end_matches('/'));

        let indexes = if recent { self.recent_indexes() } else { Vec::new() };

        debug!(query = %query, size, recent, "searching log-index backend");

        let mut request = self.client.post(&url).query(&[("size", size.to_string())]);
        if !indexes.is_empty() {
            request = request.query(&[("index", indexes.join(","))]);
        }

        let response = request.json(query).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Protocol(format!(
                "backend returned status {status}: {body}"
            )));
        }

        let raw: RawResponse = response.json().await?;
        Ok(Self::to_result_set(raw))
    }
}

fn format_index(template: &str, when: chrono::DateTime<Utc>) -> String {
    when.format(template).to_string()
}
