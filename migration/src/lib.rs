//! Database migrations for the news feed content service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_11_01_102700_create_content_providers;
mod m2025_11_01_102800_create_contents;
mod m2025_11_01_103100_create_ingest_runs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_11_01_102700_create_content_providers::Migration),
            Box::new(m2025_11_01_102800_create_contents::Migration),
            Box::new(m2025_11_01_103100_create_ingest_runs::Migration),
        ]
    }
}
