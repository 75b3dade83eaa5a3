//! Test utilities for database testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations, plus fixtures shared by the integration tests.

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use news_feed_content::config::IngestConfig;
use news_feed_content::models::provider;
use news_feed_content::repositories::{ContentRecord, ProviderRepository};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Sets up an in-memory SQLite database with all migrations applied and returns an Arc.
#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Registers a provider pointing at `endpoint_url`.
#[allow(dead_code)]
pub async fn create_test_provider(
    db: &Arc<DatabaseConnection>,
    name: &str,
    endpoint_url: &str,
) -> Result<provider::Model> {
    ProviderRepository::new(db.clone())
        .create(name, endpoint_url)
        .await
}

/// Ingest settings with no throttle so tests do not sleep between pages.
#[allow(dead_code)]
pub fn test_ingest_config() -> IngestConfig {
    IngestConfig {
        throttle_ms: 0,
        page_size: 10,
        max_pages: 5,
        worker_concurrency: 2,
        ..Default::default()
    }
}

/// Builds a content record with predictable optional fields.
#[allow(dead_code)]
pub fn content_record(provider_id: i32, title: &str, image_url: &str) -> ContentRecord {
    ContentRecord {
        provider_id,
        title: title.to_string(),
        short_description: Some(format!("{title} in brief")),
        about: None,
        image_url: image_url.to_string(),
        external_content_url: Some(format!("https://partner.example.com/{}", title.len())),
    }
}
