//! Migration to create the contents table.
//!
//! Contents belong to a provider and are removed with it. Ingestion upserts on
//! `(provider_id, title)`, so that pair carries a unique index.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contents::ProviderId).integer().not_null())
                    .col(ColumnDef::new(Contents::Title).string_len(254).not_null())
                    .col(
                        ColumnDef::new(Contents::ShortDescription)
                            .string_len(254)
                            .null(),
                    )
                    .col(ColumnDef::new(Contents::About).text().null())
                    .col(ColumnDef::new(Contents::ImageUrl).text().not_null())
                    .col(
                        ColumnDef::new(Contents::ExternalContentUrl)
                            .string_len(254)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Contents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Contents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contents_provider_id")
                            .from(Contents::Table, Contents::ProviderId)
                            .to(ContentProviders::Table, ContentProviders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contents_provider_title")
                    .table(Contents::Table)
                    .col(Contents::ProviderId)
                    .col(Contents::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contents_title")
                    .table(Contents::Table)
                    .col(Contents::Title)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_contents_provider_title").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_contents_title").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Contents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Contents {
    Table,
    Id,
    ProviderId,
    Title,
    ShortDescription,
    About,
    ImageUrl,
    ExternalContentUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ContentProviders {
    Table,
    Id,
}
