//! Content provider entity model
//!
//! SeaORM entity for the `content_providers` table: the registry of partner
//! APIs the ingestion worker polls.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// A registered partner API endpoint
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "content_providers")]
pub struct Model {
    /// Auto-incremented identifier (primary key)
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Display name of the content provider
    pub name: String,

    /// Partner API endpoint polled during ingestion
    pub endpoint_url: String,

    /// Timestamp when the provider was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the provider was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::content::Entity")]
    Content,
    #[sea_orm(has_many = "super::ingest_run::Entity")]
    IngestRun,
}

impl Related<super::content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Content.def()
    }
}

impl Related<super::ingest_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IngestRun.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
