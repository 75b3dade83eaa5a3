//! # Ingestion API Handlers
//!
//! Manual dispatch trigger and ingest run ledger listing.

use crate::auth::Caller;
use crate::error::ApiError;
use crate::handlers::types::parse_limit;
use crate::models::ingest_run;
use crate::repositories::IngestRunRepository;
use crate::server::AppState;
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Response for a manual dispatch
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    /// Number of provider jobs placed on the queue
    pub jobs_enqueued: usize,
}

/// Query parameters for the run ledger
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRunsQuery {
    pub provider_id: Option<i32>,
    /// Maximum number of runs to return (default: 50, max: 100)
    pub limit: Option<i64>,
}

/// One ingest run ledger row
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestRunResponse {
    pub id: String,
    pub provider_id: i32,
    /// running, succeeded, failed or truncated
    pub status: String,
    pub pages_fetched: i32,
    pub items_upserted: i32,
    pub error: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

impl From<ingest_run::Model> for IngestRunResponse {
    fn from(model: ingest_run::Model) -> Self {
        Self {
            id: model.id.to_string(),
            provider_id: model.provider_id,
            status: model.status,
            pages_fetched: model.pages_fetched,
            items_upserted: model.items_upserted,
            error: model.error,
            started_at: model.started_at.to_rfc3339(),
            finished_at: model.finished_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Enqueue one ingestion job per registered provider
#[utoipa::path(
    post,
    path = "/api/ingest/dispatch",
    security(("bearer_auth" = [])),
    responses(
        (status = 202, description = "Jobs enqueued", body = DispatchResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 503, description = "Job queue is closed or full", body = ApiError)
    ),
    tag = "ingest"
)]
pub async fn dispatch(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<(StatusCode, Json<DispatchResponse>), ApiError> {
    let jobs_enqueued = state.dispatcher.try_dispatch().await?;
    tracing::info!(subject = %caller.subject, jobs_enqueued, "Manual ingest dispatch");

    Ok((StatusCode::ACCEPTED, Json(DispatchResponse { jobs_enqueued })))
}

/// List recent ingest runs, newest first
#[utoipa::path(
    get,
    path = "/api/ingest/runs",
    security(("bearer_auth" = [])),
    params(ListRunsQuery),
    responses(
        (status = 200, description = "Recent ingest runs", body = Vec<IngestRunResponse>),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "ingest"
)]
pub async fn list_runs(
    State(state): State<AppState>,
    _caller: Caller,
    query: Result<Query<ListRunsQuery>, QueryRejection>,
) -> Result<Json<Vec<IngestRunResponse>>, ApiError> {
    let Query(query) = query?;
    let limit = parse_limit(query.limit)?;

    let runs = IngestRunRepository::new(state.db.clone())
        .list(query.provider_id, limit)
        .await?;

    Ok(Json(runs.into_iter().map(IngestRunResponse::from).collect()))
}
