//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access.

pub mod content;
pub mod ingest_run;
pub mod provider;

pub use content::{ContentFilter, ContentRecord, ContentRepository};
pub use ingest_run::{IngestRunRepository, RunOutcome};
pub use provider::ProviderRepository;
