//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the news feed
//! content API.

use crate::db;
use crate::error::{ApiError, unavailable};
use crate::models::ServiceInfo;
use crate::server::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod contents;
pub mod ingest;
pub mod providers;
pub mod types;

/// Health check body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse)
    ),
    tag = "root"
)]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check; pings the database
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Ready to serve traffic", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn readyz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = ?err, "Readiness check failed");
        unavailable("Database unavailable")
    })?;

    Ok(Json(HealthResponse {
        status: "ready".to_string(),
    }))
}

#[cfg(test)]
mod tests;
