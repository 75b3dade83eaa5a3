//! # Error Handling
//!
//! Unified API error handling: every failure is rendered as
//! `application/problem+json` carrying the request's trace id.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ingest::IngestError;
use crate::telemetry;

const PROBLEM_JSON: &str = "application/problem+json";
const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Trace id of the running request, or a generated correlation id outside one
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]).into_boxed_str())
            })
    }
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error
        .code()
        .is_some_and(|code| code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code.as_ref()))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, axum::Json(&self)).into_response();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        // Repositories wrap DbErr in anyhow; keep its mapping (409 on duplicates)
        match error.downcast::<sea_orm::DbErr>() {
            Ok(db_err) => db_err.into(),
            Err(error) => {
                tracing::error!(error = ?error, "Unhandled internal error");
                internal("An internal error occurred")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Request body must be sent as application/json".to_string()
            }
            JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => {
                format!("Request body rejected: {}", rejection.body_text())
            }
            _ => "Request body could not be read".to_string(),
        };
        ApiError::new(StatusCode::BAD_REQUEST, VALIDATION_FAILED, message)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            VALIDATION_FAILED,
            format!("Query string rejected: {}", rejection.body_text()),
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        use sea_orm::DbErr;

        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique index rejected write");
            return ApiError::new(
                StatusCode::CONFLICT,
                "CONFLICT",
                "A record with the same key already exists",
            );
        }

        match error {
            DbErr::RecordNotFound(what) => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{what} not found"))
            }
            DbErr::Conn(err) => {
                tracing::error!(error = ?err, "Database connection lost");
                unavailable("Database unavailable")
            }
            other => {
                tracing::error!(error = ?other, "Database operation failed");
                internal("Database operation failed")
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::QueueClosed => unavailable("Ingestion queue is not accepting jobs"),
            IngestError::QueueFull => unavailable("Ingestion queue is full, retry later"),
            IngestError::ProviderNotFound(id) => not_found("content provider", id),
            other => {
                tracing::error!(error = %other, kind = other.kind(), "Ingestion request failed");
                internal("Ingestion request failed")
            }
        }
    }
}

fn internal(message: &str) -> ApiError {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_SERVER_ERROR",
        message,
    )
}

/// Create a service unavailable error (503)
pub fn unavailable(message: &str) -> ApiError {
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "SERVICE_UNAVAILABLE",
        message,
    )
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create a not found error (404) naming the missing resource
pub fn not_found(resource: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("{resource} {id} not found"),
    )
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, VALIDATION_FAILED, message).with_details(field_errors)
}
