//! # Data Models
//!
//! This module contains all the data models used throughout the service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod content;
pub mod ingest_run;
pub mod provider;

pub use content::Entity as Content;
pub use ingest_run::Entity as IngestRun;
pub use provider::Entity as Provider;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "news-feed-content".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
