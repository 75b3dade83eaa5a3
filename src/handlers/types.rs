//! # Common API Types
//!
//! Shared response wrappers and request validation helpers used across the
//! API handlers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use url::Url;
use utoipa::ToSchema;

use crate::error::{ApiError, validation_error};

/// Default page size for list endpoints
pub const DEFAULT_LIMIT: i64 = 50;
/// Largest page size a client may request
pub const MAX_LIMIT: i64 = 100;
/// Column width of the bounded text fields
pub const MAX_FIELD_LEN: usize = 254;

/// Generic paginated response wrapper for list endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// List of items for the current page
    pub data: Vec<T>,
    /// Opaque cursor for fetching the next page (null if this is the last page)
    pub next_cursor: Option<String>,
    /// Convenience field indicating if more pages exist
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    /// Create a new paginated response
    pub fn new(data: Vec<T>, next_cursor: Option<String>) -> Self {
        let has_more = next_cursor.is_some();
        Self {
            data,
            next_cursor,
            has_more,
        }
    }
}

/// Validates an optional `limit` query parameter
pub fn parse_limit(limit: Option<i64>) -> Result<u64, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(validation_error(
            "limit must be between 1 and 100",
            json!({ "limit": limit }),
        ));
    }
    Ok(limit as u64)
}

/// Collects per-field validation failures into one 400 response
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Map<String, Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| Value::String(message.into()));
    }

    /// Required text: non-blank and within the column width
    pub fn required_text(&mut self, field: &str, value: &str, max_len: Option<usize>) {
        if value.trim().is_empty() {
            self.add(field, "must not be empty");
        } else if let Some(max) = max_len {
            self.max_len(field, value, max);
        }
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    /// Absolute http(s) URL within the column width
    pub fn http_url(&mut self, field: &str, value: &str) {
        self.max_len(field, value, MAX_FIELD_LEN);
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => self.add(field, "must be an absolute http or https URL"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(validation_error(
                "Request validation failed",
                Value::Object(self.errors),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn limit_bounds() {
        assert_eq!(parse_limit(None).unwrap(), 50);
        assert_eq!(parse_limit(Some(100)).unwrap(), 100);
        assert_eq!(
            parse_limit(Some(0)).unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
        assert!(parse_limit(Some(101)).is_err());
    }

    #[test]
    fn field_errors_collect_first_message_per_field() {
        let mut errors = FieldErrors::new();
        errors.required_text("name", "  ", Some(MAX_FIELD_LEN));
        errors.http_url("endpoint_url", "ftp://example.com/feed");
        errors.http_url("other_url", "https://example.com/feed");

        let err = errors.into_result().unwrap_err();
        let details = err.details.unwrap();
        assert_eq!(details["name"], "must not be empty");
        assert!(details.get("endpoint_url").is_some());
        assert!(details.get("other_url").is_none());
    }

    #[test]
    fn max_len_counts_characters() {
        let mut errors = FieldErrors::new();
        errors.required_text("title", &"é".repeat(MAX_FIELD_LEN), Some(MAX_FIELD_LEN));
        assert!(errors.is_empty());

        errors.required_text("title", &"a".repeat(MAX_FIELD_LEN + 1), Some(MAX_FIELD_LEN));
        assert!(!errors.is_empty());
    }
}
