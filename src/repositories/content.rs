//! Content repository for database operations
//!
//! CRUD access to the contents table plus the bulk upsert used by the
//! ingestion worker.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::content::{self, Entity as Content};

/// Writable fields of a content row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub provider_id: i32,
    pub title: String,
    pub short_description: Option<String>,
    pub about: Option<String>,
    pub image_url: String,
    pub external_content_url: Option<String>,
}

/// Filters accepted by [`ContentRepository::list`]
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub provider_id: Option<i32>,
    /// Substring matched against the title
    pub search: Option<String>,
}

/// Repository for content database operations
#[derive(Debug, Clone)]
pub struct ContentRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ContentRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<content::Model>> {
        Ok(Content::find_by_id(id).one(&*self.db).await?)
    }

    /// Lists contents ordered by id, starting after `after_id`
    pub async fn list(
        &self,
        filter: &ContentFilter,
        after_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<content::Model>> {
        let mut query = Content::find().order_by_asc(content::Column::Id);

        if let Some(provider_id) = filter.provider_id {
            query = query.filter(content::Column::ProviderId.eq(provider_id));
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(content::Column::Title.contains(term));
        }
        if let Some(after) = after_id {
            query = query.filter(content::Column::Id.gt(after));
        }

        Ok(query.limit(limit).all(&*self.db).await?)
    }

    /// Inserts a single content row
    ///
    /// A second row with the same provider and title violates the unique
    /// index and surfaces as a database error.
    pub async fn create(&self, record: ContentRecord) -> Result<content::Model> {
        let now = Utc::now().fixed_offset();
        let am = content::ActiveModel {
            provider_id: Set(record.provider_id),
            title: Set(record.title),
            short_description: Set(record.short_description),
            about: Set(record.about),
            image_url: Set(record.image_url),
            external_content_url: Set(record.external_content_url),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(am.insert(&*self.db).await?)
    }

    /// Overwrites every writable field of an existing row
    ///
    /// Returns `Ok(None)` when the row does not exist.
    pub async fn update(&self, id: i32, record: ContentRecord) -> Result<Option<content::Model>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut am: content::ActiveModel = existing.into();
        am.provider_id = Set(record.provider_id);
        am.title = Set(record.title);
        am.short_description = Set(record.short_description);
        am.about = Set(record.about);
        am.image_url = Set(record.image_url);
        am.external_content_url = Set(record.external_content_url);
        am.updated_at = Set(Utc::now().fixed_offset());

        Ok(Some(am.update(&*self.db).await?))
    }

    /// Returns `false` when the row does not exist
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Content::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Inserts or updates a batch keyed on `(provider_id, title)` in one statement
    ///
    /// Existing rows keep their `created_at`; every other field is overwritten.
    /// When a batch repeats a key the last occurrence wins. Returns the number
    /// of distinct records written.
    pub async fn bulk_upsert(&self, records: Vec<ContentRecord>) -> Result<u64> {
        let records = dedupe_by_key(records);
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().fixed_offset();
        let written = records.len() as u64;
        let models = records.into_iter().map(|record| content::ActiveModel {
            provider_id: Set(record.provider_id),
            title: Set(record.title),
            short_description: Set(record.short_description),
            about: Set(record.about),
            image_url: Set(record.image_url),
            external_content_url: Set(record.external_content_url),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });

        Content::insert_many(models)
            .on_conflict(
                OnConflict::columns([content::Column::ProviderId, content::Column::Title])
                    .update_columns([
                        content::Column::ShortDescription,
                        content::Column::About,
                        content::Column::ImageUrl,
                        content::Column::ExternalContentUrl,
                        content::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        Ok(written)
    }
}

/// Collapses records sharing `(provider_id, title)` to the last one seen,
/// keeping first-seen order.
fn dedupe_by_key(records: Vec<ContentRecord>) -> Vec<ContentRecord> {
    let mut index: HashMap<(i32, String), usize> = HashMap::new();
    let mut out: Vec<ContentRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = (record.provider_id, record.title.clone());
        match index.get(&key) {
            Some(&pos) => out[pos] = record,
            None => {
                index.insert(key, out.len());
                out.push(record);
            }
        }
    }

    out
}
