//! Fetch-and-Ingest Worker
//!
//! Runs one job: resolves the provider, pages through the partner API with a
//! fixed throttle, and upserts each page into the content store. Every run is
//! recorded in the ingest_runs ledger.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::ingest::payload::PartnerPage;
use crate::models::ingest_run::{STATUS_FAILED, STATUS_SUCCEEDED, STATUS_TRUNCATED};
use crate::models::provider;
use crate::repositories::{
    ContentRecord, ContentRepository, IngestRunRepository, ProviderRepository, RunOutcome,
};

/// Longest partner error body kept in logs.
const MAX_LOGGED_BODY: usize = 512;

/// Request headers as they arrive on a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestHeaders {
    /// JSON object text, e.g. `{"Authorization": "Token abc"}`
    Encoded(String),
    Map(BTreeMap<String, String>),
}

impl Default for IngestHeaders {
    fn default() -> Self {
        Self::Map(BTreeMap::new())
    }
}

impl IngestHeaders {
    /// Decodes the headers into a map, parsing JSON text when necessary
    pub fn normalize(&self) -> Result<BTreeMap<String, String>, IngestError> {
        match self {
            Self::Map(map) => Ok(map.clone()),
            Self::Encoded(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Self::Encoded(text) => serde_json::from_str(text)
                .map_err(|err| IngestError::InvalidHeaders(err.to_string())),
        }
    }
}

/// Work item for a single provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestJob {
    pub provider_id: i32,
    pub method: String,
    pub url: String,
    pub headers: IngestHeaders,
    /// First page to request (1-based)
    pub page: u32,
    /// Overrides the configured page size when set
    pub page_size: Option<u32>,
}

impl IngestJob {
    /// Default job for a registered provider: GET its endpoint from page 1
    pub fn for_provider(provider: &provider::Model) -> Self {
        Self {
            provider_id: provider.id,
            method: "GET".to_string(),
            url: provider.endpoint_url.clone(),
            headers: IngestHeaders::default(),
            page: 1,
            page_size: None,
        }
    }
}

/// Result of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub run_id: Uuid,
    pub provider_id: i32,
    pub pages_fetched: u32,
    pub items_upserted: u64,
    /// The page limit was reached while the partner still reported more pages
    pub truncated: bool,
}

/// Errors raised while running an ingestion job. None of them is retried.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("content provider {0} not found")]
    ProviderNotFound(i32),
    #[error("invalid request headers: {0}")]
    InvalidHeaders(String),
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("partner request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("partner returned status {status}")]
    UnexpectedStatus { status: u16 },
    #[error("malformed partner payload: {0}")]
    MalformedPayload(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("ingest job queue is closed")]
    QueueClosed,
    #[error("ingest job queue is full")]
    QueueFull,
    #[error("cancelled")]
    Cancelled,
}

impl IngestError {
    pub(crate) fn database(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderNotFound(_) => "provider_not_found",
            Self::InvalidHeaders(_) => "invalid_headers",
            Self::InvalidMethod(_) => "invalid_method",
            Self::Http(_) => "http",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Database(_) => "database",
            Self::QueueClosed => "queue_closed",
            Self::QueueFull => "queue_full",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    pages_fetched: u32,
    items_upserted: u64,
}

/// Executes ingestion jobs against partner APIs
pub struct IngestWorker {
    providers: ProviderRepository,
    contents: ContentRepository,
    runs: IngestRunRepository,
    http: reqwest::Client,
    config: IngestConfig,
}

impl IngestWorker {
    /// Create a worker with its own HTTP client
    pub fn new(db: Arc<DatabaseConnection>, config: IngestConfig) -> Result<Self, IngestError> {
        // No request timeout: a hung partner blocks only its own job
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::with_client(db, config, http))
    }

    pub fn with_client(
        db: Arc<DatabaseConnection>,
        config: IngestConfig,
        http: reqwest::Client,
    ) -> Self {
        Self {
            providers: ProviderRepository::new(db.clone()),
            contents: ContentRepository::new(db.clone()),
            runs: IngestRunRepository::new(db),
            http,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run one job to completion
    pub async fn run(&self, job: IngestJob) -> Result<IngestSummary, IngestError> {
        self.run_until_cancelled(job, &CancellationToken::new()).await
    }

    /// Run one job, abandoning it at the next throttle or request when
    /// `shutdown` fires; the ledger row is then closed as failed
    #[instrument(
        skip(self, job, shutdown),
        fields(provider_id = job.provider_id, run_id = tracing::field::Empty)
    )]
    pub async fn run_until_cancelled(
        &self,
        job: IngestJob,
        shutdown: &CancellationToken,
    ) -> Result<IngestSummary, IngestError> {
        let started = Instant::now();

        let Some(provider) = self
            .providers
            .find_by_id(job.provider_id)
            .await
            .map_err(IngestError::database)?
        else {
            warn!("Content provider not found, skipping ingestion");
            counter!("ingest_runs_total", "status" => "provider_not_found").increment(1);
            return Err(IngestError::ProviderNotFound(job.provider_id));
        };

        let headers = build_header_map(&job.headers.normalize()?)?;
        let method = Method::from_bytes(job.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| IngestError::InvalidMethod(job.method.clone()))?;

        let run = self
            .runs
            .start(provider.id)
            .await
            .map_err(IngestError::database)?;
        Span::current().record("run_id", tracing::field::display(run.id));
        info!(url = %job.url, "Starting ingestion run");

        let mut progress = Progress::default();
        let result = self
            .ingest_pages(&job, method, headers, shutdown, &mut progress)
            .await;

        let status = match &result {
            Ok(false) => STATUS_SUCCEEDED,
            Ok(true) => STATUS_TRUNCATED,
            Err(_) => STATUS_FAILED,
        };
        let error_text = result.as_ref().err().map(|err| err.to_string());

        counter!("ingest_runs_total", "status" => status).increment(1);
        histogram!("ingest_run_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);

        let finished = self
            .runs
            .finish(
                run.id,
                RunOutcome {
                    status,
                    pages_fetched: progress.pages_fetched,
                    items_upserted: progress.items_upserted,
                    error: error_text.as_deref(),
                },
            )
            .await;

        match result {
            Ok(truncated) => {
                finished.map_err(IngestError::database)?;
                info!(
                    pages = progress.pages_fetched,
                    items = progress.items_upserted,
                    truncated,
                    "Ingestion run completed"
                );
                Ok(IngestSummary {
                    run_id: run.id,
                    provider_id: provider.id,
                    pages_fetched: progress.pages_fetched,
                    items_upserted: progress.items_upserted,
                    truncated,
                })
            }
            Err(err) => {
                if let Err(ledger_err) = finished {
                    error!(error = ?ledger_err, "Failed to record failed ingestion run");
                }
                counter!("ingest_failures_total", "kind" => err.kind()).increment(1);
                error!(
                    error = %err,
                    pages = progress.pages_fetched,
                    "Ingestion run failed"
                );
                Err(err)
            }
        }
    }

    /// Pages through the partner API; returns whether the page limit cut the run short
    async fn ingest_pages(
        &self,
        job: &IngestJob,
        method: Method,
        headers: HeaderMap,
        shutdown: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<bool, IngestError> {
        let page_size = job.page_size.unwrap_or(self.config.page_size);
        let throttle = Duration::from_millis(self.config.throttle_ms);
        let mut page = job.page.max(1);

        loop {
            if progress.pages_fetched >= self.config.max_pages {
                warn!(
                    max_pages = self.config.max_pages,
                    next_page = page,
                    "Page limit reached, truncating ingestion run"
                );
                return Ok(true);
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(IngestError::Cancelled),
                _ = sleep(throttle) => {}
            }

            let body = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(IngestError::Cancelled),
                body = self.fetch_page(job, method.clone(), headers.clone(), page, page_size) => body?,
            };
            progress.pages_fetched += 1;
            counter!("ingest_pages_fetched_total").increment(1);

            let records: Vec<ContentRecord> = body
                .results
                .into_iter()
                .map(|item| item.into_record(job.provider_id))
                .collect();
            let written = self
                .contents
                .bulk_upsert(records)
                .await
                .map_err(IngestError::database)?;
            progress.items_upserted += written;
            counter!("ingest_items_upserted_total").increment(written);

            debug!(page, written, "Stored partner page");

            if !body.pagination.has_next() {
                return Ok(false);
            }
            page += 1;
        }
    }

    async fn fetch_page(
        &self,
        job: &IngestJob,
        method: Method,
        headers: HeaderMap,
        page: u32,
        page_size: u32,
    ) -> Result<PartnerPage, IngestError> {
        let response = self
            .http
            .request(method, &job.url)
            .headers(headers)
            .query(&[("page", page), ("page_size", page_size)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            warn!(
                status = status.as_u16(),
                page,
                body = %truncate_body(&body),
                "Partner returned unexpected status"
            );
            return Err(IngestError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        serde_json::from_str(&body).map_err(|err| IngestError::MalformedPayload(err.to_string()))
    }
}

fn build_header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, IngestError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| IngestError::InvalidHeaders(format!("invalid header name '{name}'")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| IngestError::InvalidHeaders(format!("invalid value for header '{name}'")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn truncate_body(body: &str) -> &str {
    if body.len() <= MAX_LOGGED_BODY {
        return body;
    }
    let mut end = MAX_LOGGED_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
