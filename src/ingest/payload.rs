//! Partner API response shapes
//!
//! Every partner answers a page request with
//! `{"pagination": {"next", "previous", "count"}, "results": [...]}`.

use serde::Deserialize;
use serde_json::Value;

use crate::repositories::ContentRecord;

/// One page of a partner response
#[derive(Debug, Clone, Deserialize)]
pub struct PartnerPage {
    pub pagination: Pagination,
    pub results: Vec<PartnerItem>,
}

/// Pagination block of a partner response
///
/// `next` and `previous` are opaque: partners send URLs, page numbers or
/// booleans, so only their presence is interpreted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<Value>,
    #[serde(default)]
    pub previous: Option<Value>,
    #[serde(default)]
    pub count: Option<u64>,
}

impl Pagination {
    /// Whether the partner reports another page after this one
    pub fn has_next(&self) -> bool {
        match &self.next {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

/// A single partner result; unknown fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct PartnerItem {
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub external_content_url: Option<String>,
}

impl PartnerItem {
    pub fn into_record(self, provider_id: i32) -> ContentRecord {
        ContentRecord {
            provider_id,
            title: self.title,
            short_description: self.short_description,
            about: self.about,
            image_url: self.image_url,
            external_content_url: self.external_content_url,
        }
    }
}
