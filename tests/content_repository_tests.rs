//! Integration tests for ContentRepository, focused on the bulk upsert path.

use anyhow::Result;
use news_feed_content::repositories::{ContentFilter, ContentRepository};
use std::time::Duration;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{content_record, create_test_provider, setup_test_db_arc};

#[tokio::test]
async fn bulk_upsert_updates_in_place_and_keeps_created_at() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let provider = create_test_provider(&db, "Partner", "https://p.example.com").await?;
    let repo = ContentRepository::new(db.clone());

    let written = repo
        .bulk_upsert(vec![content_record(provider.id, "Headline", "img/v1.png")])
        .await?;
    assert_eq!(written, 1);

    let first = repo.list(&ContentFilter::default(), None, 10).await?;
    assert_eq!(first.len(), 1);
    let original = first[0].clone();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut changed = content_record(provider.id, "Headline", "img/v2.png");
    changed.about = Some("Longer story".to_string());
    repo.bulk_upsert(vec![changed]).await?;

    let after = repo.list(&ContentFilter::default(), None, 10).await?;
    assert_eq!(after.len(), 1);
    let row = &after[0];
    assert_eq!(row.id, original.id);
    assert_eq!(row.image_url, "img/v2.png");
    assert_eq!(row.about.as_deref(), Some("Longer story"));
    assert_eq!(row.created_at, original.created_at);
    assert!(row.updated_at > original.updated_at);
    Ok(())
}

#[tokio::test]
async fn rerunning_the_same_batch_is_idempotent() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let provider = create_test_provider(&db, "Partner", "https://p.example.com").await?;
    let repo = ContentRepository::new(db.clone());

    let batch = vec![
        content_record(provider.id, "One", "img/1.png"),
        content_record(provider.id, "Two", "img/2.png"),
    ];
    repo.bulk_upsert(batch.clone()).await?;
    repo.bulk_upsert(batch).await?;

    let rows = repo.list(&ContentFilter::default(), None, 10).await?;
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two"]);
    Ok(())
}

#[tokio::test]
async fn same_title_under_two_providers_stays_separate() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let first = create_test_provider(&db, "First", "https://1.example.com").await?;
    let second = create_test_provider(&db, "Second", "https://2.example.com").await?;
    let repo = ContentRepository::new(db.clone());

    repo.bulk_upsert(vec![
        content_record(first.id, "Shared", "img/first.png"),
        content_record(second.id, "Shared", "img/second.png"),
    ])
    .await?;

    let filter = ContentFilter {
        provider_id: Some(second.id),
        search: None,
    };
    let rows = repo.list(&filter, None, 10).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].image_url, "img/second.png");
    assert_eq!(repo.list(&ContentFilter::default(), None, 10).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn duplicate_keys_in_one_batch_collapse_to_the_last() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let provider = create_test_provider(&db, "Partner", "https://p.example.com").await?;
    let repo = ContentRepository::new(db.clone());

    let written = repo
        .bulk_upsert(vec![
            content_record(provider.id, "Dup", "img/old.png"),
            content_record(provider.id, "Dup", "img/new.png"),
        ])
        .await?;
    assert_eq!(written, 1);

    let rows = repo.list(&ContentFilter::default(), None, 10).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].image_url, "img/new.png");
    Ok(())
}

#[tokio::test]
async fn empty_batch_writes_nothing() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = ContentRepository::new(db.clone());

    assert_eq!(repo.bulk_upsert(Vec::new()).await?, 0);
    assert!(repo.list(&ContentFilter::default(), None, 10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn create_rejects_duplicate_title_for_provider() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let provider = create_test_provider(&db, "Partner", "https://p.example.com").await?;
    let repo = ContentRepository::new(db.clone());

    repo.create(content_record(provider.id, "Unique", "img/a.png"))
        .await?;
    let err = repo
        .create(content_record(provider.id, "Unique", "img/b.png"))
        .await
        .expect_err("duplicate title should fail");
    assert!(err.downcast_ref::<sea_orm::DbErr>().is_some());
    Ok(())
}

#[tokio::test]
async fn search_and_cursor_filter_contents() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let provider = create_test_provider(&db, "Partner", "https://p.example.com").await?;
    let repo = ContentRepository::new(db.clone());

    repo.bulk_upsert(vec![
        content_record(provider.id, "Market update", "img/1.png"),
        content_record(provider.id, "Weather", "img/2.png"),
        content_record(provider.id, "Market close", "img/3.png"),
    ])
    .await?;

    let filter = ContentFilter {
        provider_id: None,
        search: Some("Market".to_string()),
    };
    let matches = repo.list(&filter, None, 10).await?;
    assert_eq!(matches.len(), 2);

    let rest = repo.list(&filter, Some(matches[0].id), 10).await?;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].title, "Market close");
    Ok(())
}
