//! # IngestRun Repository
//!
//! Ledger operations for the ingest_runs table: one row per fetch-and-ingest job.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::ingest_run::{self, Entity as IngestRun, STATUS_RUNNING};

/// Final counters recorded when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome<'a> {
    pub status: &'a str,
    pub pages_fetched: u32,
    pub items_upserted: u64,
    pub error: Option<&'a str>,
}

/// Repository for ingest run ledger rows
#[derive(Debug, Clone)]
pub struct IngestRunRepository {
    pub db: Arc<DatabaseConnection>,
}

impl IngestRunRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Opens a ledger row in `running` state
    pub async fn start(&self, provider_id: i32) -> Result<ingest_run::Model> {
        let am = ingest_run::ActiveModel {
            id: Set(Uuid::new_v4()),
            provider_id: Set(provider_id),
            status: Set(STATUS_RUNNING.to_string()),
            pages_fetched: Set(0),
            items_upserted: Set(0),
            error: Set(None),
            started_at: Set(Utc::now().fixed_offset()),
            finished_at: Set(None),
        };
        Ok(am.insert(&*self.db).await?)
    }

    /// Closes a ledger row with its final status and counters
    pub async fn finish(&self, id: Uuid, outcome: RunOutcome<'_>) -> Result<ingest_run::Model> {
        let existing = IngestRun::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("ingest run '{}' not found", id))?;

        let mut am: ingest_run::ActiveModel = existing.into();
        am.status = Set(outcome.status.to_string());
        am.pages_fetched = Set(i32::try_from(outcome.pages_fetched).unwrap_or(i32::MAX));
        am.items_upserted = Set(i32::try_from(outcome.items_upserted).unwrap_or(i32::MAX));
        am.error = Set(outcome.error.map(str::to_string));
        am.finished_at = Set(Some(Utc::now().fixed_offset()));

        Ok(am.update(&*self.db).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ingest_run::Model>> {
        Ok(IngestRun::find_by_id(id).one(&*self.db).await?)
    }

    /// Lists the most recent runs first
    pub async fn list(&self, provider_id: Option<i32>, limit: u64) -> Result<Vec<ingest_run::Model>> {
        let mut query = IngestRun::find().order_by_desc(ingest_run::Column::StartedAt);
        if let Some(provider_id) = provider_id {
            query = query.filter(ingest_run::Column::ProviderId.eq(provider_id));
        }
        Ok(query.limit(limit).all(&*self.db).await?)
    }
}
