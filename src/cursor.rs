//! # Cursor Utilities
//!
//! Opaque keyset cursors for list endpoints: base64 of `{"id": <last id>}`.

use crate::error::ApiError;
use axum::http::StatusCode;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Upper bound on the encoded cursor length accepted from clients.
const MAX_CURSOR_LEN: usize = 256;

/// Decoded cursor payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorData {
    /// Id of the last row on the previous page
    pub id: i32,
}

fn invalid(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
}

/// Encode the last id of a page as an opaque base64 string
pub fn encode_cursor(id: i32) -> String {
    let json = serde_json::json!({ "id": id }).to_string();
    base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
}

/// Decode cursor data from an opaque base64 string with validation
pub fn decode_cursor(cursor: &str) -> Result<CursorData, ApiError> {
    if cursor.is_empty() {
        return Err(invalid("cursor cannot be empty"));
    }

    if cursor.len() > MAX_CURSOR_LEN {
        return Err(invalid("cursor is too long"));
    }

    if !cursor
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return Err(invalid("cursor contains invalid characters"));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .map_err(|_| invalid("cursor is not valid base64"))?;

    let json = String::from_utf8(decoded).map_err(|_| invalid("cursor contains invalid UTF-8 data"))?;

    let data: CursorData =
        serde_json::from_str(&json).map_err(|_| invalid("cursor contains invalid JSON structure"))?;

    if data.id < 0 {
        return Err(invalid("cursor contains invalid ID"));
    }

    Ok(data)
}

/// Turn a `limit + 1` fetch into a page and the cursor for the next one
pub fn paginate<T>(mut rows: Vec<T>, limit: u64, id_of: impl Fn(&T) -> i32) -> (Vec<T>, Option<String>) {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    if rows.len() <= limit {
        return (rows, None);
    }
    rows.truncate(limit);
    let next = rows.last().map(|row| encode_cursor(id_of(row)));
    (rows, next)
}
