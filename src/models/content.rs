//! Content entity model
//!
//! SeaORM entity for the `contents` table. Rows are written by the ingestion
//! worker (upserted on `(provider_id, title)`) or directly through the API.

use super::provider::Entity as Provider;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// One ingested item of partner content
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning provider; rows are deleted with it
    pub provider_id: i32,

    pub title: String,

    pub short_description: Option<String>,

    /// Full description of the content
    #[sea_orm(column_type = "Text", nullable)]
    pub about: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub image_url: String,

    /// Link to the content on the partner's site
    pub external_content_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Provider",
        from = "Column::ProviderId",
        to = "super::provider::Column::Id",
        on_delete = "Cascade"
    )]
    Provider,
}

impl Related<Provider> for Entity {
    fn to() -> RelationDef {
        Relation::Provider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
