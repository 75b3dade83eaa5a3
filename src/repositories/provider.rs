//! Provider repository for database operations
//!
//! This module provides the ProviderRepository struct which encapsulates
//! SeaORM operations for the content_providers table.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;

use crate::models::content::{self, Entity as Content};
use crate::models::ingest_run::{self, Entity as IngestRun};
use crate::models::provider::{self, Entity as Provider};

/// Repository for provider database operations
#[derive(Debug, Clone)]
pub struct ProviderRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ProviderRepository {
    /// Creates a new ProviderRepository instance
    ///
    /// # Arguments
    ///
    /// * `db` - Database connection pool
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a provider by its id
    ///
    /// # Returns
    ///
    /// Returns a Result containing the provider model if found
    pub async fn find_by_id(&self, id: i32) -> Result<Option<provider::Model>> {
        let provider = Provider::find_by_id(id).one(&*self.db).await?;
        Ok(provider)
    }

    /// Returns every registered provider ordered by id
    pub async fn list_all(&self) -> Result<Vec<provider::Model>> {
        let providers = Provider::find()
            .order_by_asc(provider::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(providers)
    }

    /// Lists providers with keyset pagination
    ///
    /// # Arguments
    ///
    /// * `search` - Optional substring matched against the provider name
    /// * `after_id` - Only rows with a greater id are returned
    /// * `limit` - Maximum number of rows to return
    pub async fn list(
        &self,
        search: Option<&str>,
        after_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<provider::Model>> {
        let mut query = Provider::find().order_by_asc(provider::Column::Id);

        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(provider::Column::Name.contains(term));
        }

        if let Some(after) = after_id {
            query = query.filter(provider::Column::Id.gt(after));
        }

        let providers = query.limit(limit).all(&*self.db).await?;
        Ok(providers)
    }

    /// Creates a new provider
    ///
    /// # Returns
    ///
    /// Returns a Result containing the created provider model
    pub async fn create(&self, name: &str, endpoint_url: &str) -> Result<provider::Model> {
        let now = Utc::now().fixed_offset();
        let am = provider::ActiveModel {
            name: Set(name.to_string()),
            endpoint_url: Set(endpoint_url.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(am.insert(&*self.db).await?)
    }

    /// Replaces the name and endpoint of an existing provider
    ///
    /// Returns `Ok(None)` when no provider has the given id.
    pub async fn update(
        &self,
        id: i32,
        name: &str,
        endpoint_url: &str,
    ) -> Result<Option<provider::Model>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut am: provider::ActiveModel = existing.into();
        am.name = Set(name.to_string());
        am.endpoint_url = Set(endpoint_url.to_string());
        am.updated_at = Set(Utc::now().fixed_offset());

        Ok(Some(am.update(&*self.db).await?))
    }

    /// Deletes a provider together with its contents and ingest runs
    ///
    /// Returns `false` when no provider has the given id.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.db.begin().await?;

        // Dependent rows go first so the cascade holds even without FK enforcement
        Content::delete_many()
            .filter(content::Column::ProviderId.eq(id))
            .exec(&txn)
            .await?;
        IngestRun::delete_many()
            .filter(ingest_run::Column::ProviderId.eq(id))
            .exec(&txn)
            .await?;
        let result = Provider::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}
