//! IngestRun entity model
//!
//! SeaORM entity for the `ingest_runs` table, a ledger with one row per
//! fetch-and-ingest job.

use super::provider::Entity as Provider;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Run is in progress
pub const STATUS_RUNNING: &str = "running";
/// Every page was fetched and stored
pub const STATUS_SUCCEEDED: &str = "succeeded";
/// The run stopped on an error; earlier pages stay stored
pub const STATUS_FAILED: &str = "failed";
/// The run stopped at the configured page limit while more pages remained
pub const STATUS_TRUNCATED: &str = "truncated";

/// Ledger row for a single ingestion job
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ingest_runs")]
pub struct Model {
    /// Unique identifier for the run (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Provider being ingested
    pub provider_id: i32,

    /// One of running, succeeded, failed, truncated
    pub status: String,

    /// Number of pages fetched from the partner API
    pub pages_fetched: i32,

    /// Number of content rows written by the run
    pub items_upserted: i32,

    /// Error message if the run failed
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,

    /// Timestamp when the run started
    pub started_at: DateTimeWithTimeZone,

    /// Timestamp when the run finished
    pub finished_at: Option<DateTimeWithTimeZone>,
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
