//! Migration to create the content_providers table.
//!
//! Each row registers one partner API endpoint polled by the ingestion worker.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContentProviders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContentProviders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContentProviders::Name)
                            .string_len(254)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentProviders::EndpointUrl)
                            .string_len(254)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentProviders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ContentProviders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_content_providers_name")
                    .table(ContentProviders::Table)
                    .col(ContentProviders::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_content_providers_name").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ContentProviders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ContentProviders {
    Table,
    Id,
    Name,
    EndpointUrl,
    CreatedAt,
    UpdatedAt,
}
