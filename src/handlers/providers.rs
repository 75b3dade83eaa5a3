//! # Content Providers API Handlers
//!
//! CRUD endpoints over the provider registry.

use crate::auth::Caller;
use crate::cursor::{decode_cursor, paginate};
use crate::error::{ApiError, not_found};
use crate::handlers::types::{FieldErrors, MAX_FIELD_LEN, PaginatedResponse, parse_limit};
use crate::models::provider;
use crate::repositories::ProviderRepository;
use crate::server::AppState;
use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header::LOCATION},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for providers listing
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProvidersQuery {
    /// Maximum number of providers to return (default: 50, max: 100)
    pub limit: Option<i64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
    /// Case-sensitive substring filter on the provider name
    pub search: Option<String>,
}

/// Request payload for creating or replacing a provider
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProviderRequest {
    /// Display name (max 254 characters)
    #[schema(example = "Daily Planet")]
    pub name: String,
    /// Partner API endpoint polled during ingestion (absolute http/https URL)
    #[schema(example = "https://partner.example.com/api/contents")]
    pub endpoint_url: String,
}

/// Provider representation returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProviderResponse {
    pub id: i32,
    pub name: String,
    pub endpoint_url: String,
    /// ISO 8601 creation timestamp
    pub created_at: String,
    /// ISO 8601 last update timestamp
    pub updated_at: String,
}

impl From<provider::Model> for ProviderResponse {
    fn from(model: provider::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            endpoint_url: model.endpoint_url,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

impl ProviderRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, Some(MAX_FIELD_LEN));
        errors.http_url("endpoint_url", self.endpoint_url.trim());
        errors.into_result()
    }
}

fn repository(state: &AppState) -> ProviderRepository {
    ProviderRepository::new(state.db.clone())
}

/// List content providers
#[utoipa::path(
    get,
    path = "/api/content-providers",
    security(("bearer_auth" = [])),
    params(ListProvidersQuery),
    responses(
        (status = 200, description = "Page of content providers", body = PaginatedResponse<ProviderResponse>),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "content-providers"
)]
pub async fn list_providers(
    State(state): State<AppState>,
    _caller: Caller,
    query: Result<Query<ListProvidersQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ProviderResponse>>, ApiError> {
    let Query(query) = query?;
    let limit = parse_limit(query.limit)?;
    let after_id = query
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()?
        .map(|cursor| cursor.id);

    let rows = repository(&state)
        .list(query.search.as_deref(), after_id, limit + 1)
        .await?;
    let (rows, next_cursor) = paginate(rows, limit, |row| row.id);

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(ProviderResponse::from).collect(),
        next_cursor,
    )))
}

/// Register a content provider
#[utoipa::path(
    post,
    path = "/api/content-providers",
    security(("bearer_auth" = [])),
    request_body = ProviderRequest,
    responses(
        (status = 201, description = "Provider created", body = ProviderResponse, headers(
            ("Location", description = "URL of the created provider")
        )),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "content-providers"
)]
pub async fn create_provider(
    State(state): State<AppState>,
    _caller: Caller,
    payload: Result<Json<ProviderRequest>, JsonRejection>,
) -> Result<(StatusCode, [(axum::http::HeaderName, String); 1], Json<ProviderResponse>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let created = repository(&state)
        .create(request.name.trim(), request.endpoint_url.trim())
        .await?;
    tracing::info!(provider_id = created.id, "Content provider created");

    let location = format!("/api/content-providers/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(created.into()),
    ))
}

/// Fetch one content provider
#[utoipa::path(
    get,
    path = "/api/content-providers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Provider id")),
    responses(
        (status = 200, description = "Provider found", body = ProviderResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Provider not found", body = ApiError)
    ),
    tag = "content-providers"
)]
pub async fn get_provider(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i32>,
) -> Result<Json<ProviderResponse>, ApiError> {
    repository(&state)
        .find_by_id(id)
        .await?
        .map(|model| Json(model.into()))
        .ok_or_else(|| not_found("content provider", id))
}

/// Replace a content provider
#[utoipa::path(
    put,
    path = "/api/content-providers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Provider id")),
    request_body = ProviderRequest,
    responses(
        (status = 200, description = "Provider updated", body = ProviderResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Provider not found", body = ApiError)
    ),
    tag = "content-providers"
)]
pub async fn update_provider(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i32>,
    payload: Result<Json<ProviderRequest>, JsonRejection>,
) -> Result<Json<ProviderResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    repository(&state)
        .update(id, request.name.trim(), request.endpoint_url.trim())
        .await?
        .map(|model| Json(model.into()))
        .ok_or_else(|| not_found("content provider", id))
}

/// Delete a content provider and all of its contents
#[utoipa::path(
    delete,
    path = "/api/content-providers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Provider id")),
    responses(
        (status = 204, description = "Provider deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Provider not found", body = ApiError)
    ),
    tag = "content-providers"
)]
pub async fn delete_provider(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if repository(&state).delete(id).await? {
        tracing::info!(provider_id = id, "Content provider deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("content provider", id))
    }
}
