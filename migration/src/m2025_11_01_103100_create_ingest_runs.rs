//! Migration to create the ingest_runs table.
//!
//! One row per fetch-and-ingest job, written by the worker as the job starts
//! and updated when it finishes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IngestRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IngestRuns::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IngestRuns::ProviderId).integer().not_null())
                    .col(
                        ColumnDef::new(IngestRuns::Status)
                            .text()
                            .not_null()
                            .default("running"),
                    )
                    .col(
                        ColumnDef::new(IngestRuns::PagesFetched)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(IngestRuns::ItemsUpserted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(IngestRuns::Error).text().null())
                    .col(
                        ColumnDef::new(IngestRuns::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(IngestRuns::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ingest_runs_provider_id")
                            .from(IngestRuns::Table, IngestRuns::ProviderId)
                            .to(ContentProviders::Table, ContentProviders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ingest_runs_provider_started")
                    .table(IngestRuns::Table)
                    .col(IngestRuns::ProviderId)
                    .col(IngestRuns::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_ingest_runs_provider_started")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(IngestRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IngestRuns {
    Table,
    Id,
    ProviderId,
    Status,
    PagesFetched,
    ItemsUpserted,
    Error,
    StartedAt,
    FinishedAt,
}

#[derive(DeriveIden)]
enum ContentProviders {
    Table,
    Id,
}
