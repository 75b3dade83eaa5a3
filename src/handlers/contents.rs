//! # Contents API Handlers
//!
//! CRUD endpoints over stored contents. Reads advertise the configured cache
//! lifetime through `Cache-Control`.

use crate::auth::Caller;
use crate::cursor::{decode_cursor, paginate};
use crate::error::{ApiError, not_found};
use crate::handlers::types::{FieldErrors, MAX_FIELD_LEN, PaginatedResponse, parse_limit};
use crate::models::content;
use crate::repositories::{ContentFilter, ContentRecord, ContentRepository, ProviderRepository};
use crate::server::AppState;
use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{
        HeaderName, StatusCode,
        header::{CACHE_CONTROL, LOCATION},
    },
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for contents listing
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListContentsQuery {
    /// Maximum number of contents to return (default: 50, max: 100)
    pub limit: Option<i64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
    /// Only contents of this provider
    pub provider_id: Option<i32>,
    /// Case-sensitive substring filter on the title
    pub search: Option<String>,
}

/// Request payload for creating or replacing a content
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentRequest {
    /// Owning provider id
    pub provider_id: i32,
    /// Title, unique per provider (max 254 characters)
    #[schema(example = "Morning briefing")]
    pub title: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    /// Image location as given by the partner
    #[schema(example = "content-images/briefing.png")]
    pub image_url: String,
    /// Absolute http/https link to the content on the partner's site
    #[serde(default)]
    pub external_content_url: Option<String>,
}

/// Content representation returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    pub id: i32,
    pub provider_id: i32,
    pub title: String,
    pub short_description: Option<String>,
    pub about: Option<String>,
    pub image_url: String,
    pub external_content_url: Option<String>,
    /// ISO 8601 creation timestamp
    pub created_at: String,
    /// ISO 8601 last update timestamp
    pub updated_at: String,
}

impl From<content::Model> for ContentResponse {
    fn from(model: content::Model) -> Self {
        Self {
            id: model.id,
            provider_id: model.provider_id,
            title: model.title,
            short_description: model.short_description,
            about: model.about,
            image_url: model.image_url,
            external_content_url: model.external_content_url,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

impl ContentRequest {
    /// Validates field shapes and that the provider exists
    async fn into_record(self, state: &AppState) -> Result<ContentRecord, ApiError> {
        let mut errors = FieldErrors::new();
        errors.required_text("title", &self.title, Some(MAX_FIELD_LEN));
        errors.required_text("image_url", &self.image_url, None);
        if let Some(short) = &self.short_description {
            errors.max_len("short_description", short, MAX_FIELD_LEN);
        }
        if let Some(link) = self.external_content_url.as_deref().map(str::trim)
            && !link.is_empty()
        {
            errors.http_url("external_content_url", link);
        }

        if ProviderRepository::new(state.db.clone())
            .find_by_id(self.provider_id)
            .await?
            .is_none()
        {
            errors.add(
                "provider_id",
                format!("content provider {} does not exist", self.provider_id),
            );
        }
        errors.into_result()?;

        Ok(ContentRecord {
            provider_id: self.provider_id,
            title: self.title.trim().to_string(),
            short_description: self.short_description,
            about: self.about,
            image_url: self.image_url.trim().to_string(),
            external_content_url: self
                .external_content_url
                .map(|link| link.trim().to_string())
                .filter(|link| !link.is_empty()),
        })
    }
}

fn repository(state: &AppState) -> ContentRepository {
    ContentRepository::new(state.db.clone())
}

fn cache_control(state: &AppState) -> [(HeaderName, String); 1] {
    [(
        CACHE_CONTROL,
        format!("max-age={}", state.config.cache_expiry_seconds),
    )]
}

/// List contents
#[utoipa::path(
    get,
    path = "/api/contents",
    security(("bearer_auth" = [])),
    params(ListContentsQuery),
    responses(
        (status = 200, description = "Page of contents", body = PaginatedResponse<ContentResponse>, headers(
            ("Cache-Control", description = "max-age from the configured cache expiry")
        )),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "contents"
)]
pub async fn list_contents(
    State(state): State<AppState>,
    _caller: Caller,
    query: Result<Query<ListContentsQuery>, QueryRejection>,
) -> Result<([(HeaderName, String); 1], Json<PaginatedResponse<ContentResponse>>), ApiError> {
    let Query(query) = query?;
    let limit = parse_limit(query.limit)?;
    let after_id = query
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()?
        .map(|cursor| cursor.id);

    let filter = ContentFilter {
        provider_id: query.provider_id,
        search: query.search,
    };
    let rows = repository(&state).list(&filter, after_id, limit + 1).await?;
    let (rows, next_cursor) = paginate(rows, limit, |row| row.id);

    Ok((
        cache_control(&state),
        Json(PaginatedResponse::new(
            rows.into_iter().map(ContentResponse::from).collect(),
            next_cursor,
        )),
    ))
}

/// Create a content
#[utoipa::path(
    post,
    path = "/api/contents",
    security(("bearer_auth" = [])),
    request_body = ContentRequest,
    responses(
        (status = 201, description = "Content created", body = ContentResponse, headers(
            ("Location", description = "URL of the created content")
        )),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 409, description = "Provider already has a content with this title", body = ApiError)
    ),
    tag = "contents"
)]
pub async fn create_content(
    State(state): State<AppState>,
    _caller: Caller,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<ContentResponse>), ApiError> {
    let Json(request) = payload?;
    let record = request.into_record(&state).await?;

    let created = repository(&state).create(record).await?;
    tracing::info!(
        content_id = created.id,
        provider_id = created.provider_id,
        "Content created"
    );

    let location = format!("/api/contents/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(created.into()),
    ))
}

/// Fetch one content
#[utoipa::path(
    get,
    path = "/api/contents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Content id")),
    responses(
        (status = 200, description = "Content found", body = ContentResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Content not found", body = ApiError)
    ),
    tag = "contents"
)]
pub async fn get_content(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i32>,
) -> Result<([(HeaderName, String); 1], Json<ContentResponse>), ApiError> {
    let model = repository(&state)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("content", id))?;

    Ok((cache_control(&state), Json(model.into())))
}

/// Replace a content
#[utoipa::path(
    put,
    path = "/api/contents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Content id")),
    request_body = ContentRequest,
    responses(
        (status = 200, description = "Content updated", body = ContentResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Content not found", body = ApiError),
        (status = 409, description = "Provider already has a content with this title", body = ApiError)
    ),
    tag = "contents"
)]
pub async fn update_content(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i32>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<ContentResponse>, ApiError> {
    let Json(request) = payload?;
    let record = request.into_record(&state).await?;

    repository(&state)
        .update(id, record)
        .await?
        .map(|model| Json(model.into()))
        .ok_or_else(|| not_found("content", id))
}

/// Delete a content
#[utoipa::path(
    delete,
    path = "/api/contents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Content id")),
    responses(
        (status = 204, description = "Content deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Content not found", body = ApiError)
    ),
    tag = "contents"
)]
pub async fn delete_content(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if repository(&state).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("content", id).with_details(json!({ "content_id": id })))
    }
}
