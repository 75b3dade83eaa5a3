//! # Tests for Handlers
//!
//! Router-level tests for the API handlers against an in-memory database.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::ingest::{Dispatcher, JobReceiver, job_queue};
use crate::repositories::ProviderRepository;
use crate::server::{AppState, create_app};
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use serde_json::{Value, json};
use tower::ServiceExt;

const TOKEN: &str = "test-token-123";

struct TestApp {
    router: Router,
    /// Keeps the job queue open and lets tests inspect dispatched jobs
    jobs: JobReceiver,
}

async fn test_app() -> TestApp {
    test_app_with_queue(16).await
}

async fn test_app_with_queue(capacity: usize) -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let db = Arc::new(db);

    let config = Arc::new(AppConfig {
        operator_tokens: vec![TOKEN.to_string()],
        cache_expiry_seconds: 120,
        ..Default::default()
    });
    let (queue, jobs) = job_queue(capacity);
    let dispatcher = Dispatcher::new(ProviderRepository::new(db.clone()), queue);

    TestApp {
        router: create_app(AppState {
            config,
            db,
            dispatcher,
        }),
        jobs,
    }
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

async fn create_provider(app: &TestApp, name: &str) -> i64 {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/api/content-providers",
        Some(TOKEN),
        Some(json!({"name": name, "endpoint_url": "https://partner.example.com/api"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

fn content_body(provider_id: i64, title: &str) -> Value {
    json!({
        "provider_id": provider_id,
        "title": title,
        "short_description": "short",
        "image_url": "content-images/a.png",
        "external_content_url": "https://partner.example.com/a"
    })
}

#[tokio::test]
async fn test_root_returns_service_info() {
    let app = test_app().await;
    let (status, _, body) = send(&app, Method::GET, "/", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "news-feed-content");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_endpoints_are_public() {
    let app = test_app().await;

    let (status, _, body) = send(&app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _, body) = send(&app, Method::GET, "/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_unauthenticated_requests_get_401_problem_json() {
    let app = test_app().await;

    for uri in ["/api/contents", "/api/content-providers", "/api/ingest/runs"] {
        let (status, headers, body) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(
            headers.get("content-type").unwrap(),
            "application/problem+json"
        );
        assert_eq!(body["code"], "UNAUTHORIZED");
        // Error body and response header carry the same trace id
        let trace_header = headers.get("x-trace-id").unwrap().to_str().unwrap();
        assert_eq!(body["trace_id"], trace_header);
    }

    let (status, _, _) = send(&app, Method::GET, "/api/contents", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authenticated_content_list_is_ok_and_cacheable() {
    let app = test_app().await;
    let (status, headers, body) = send(&app, Method::GET, "/api/contents", Some(TOKEN), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("cache-control").unwrap(), "max-age=120");
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn test_provider_crud_round() {
    let app = test_app().await;
    let id = create_provider(&app, "Daily Planet").await;

    let uri = format!("/api/content-providers/{id}");
    let (status, _, body) = send(&app, Method::GET, &uri, Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Daily Planet");

    let (status, _, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(TOKEN),
        Some(json!({"name": "Daily Bugle", "endpoint_url": "http://bugle.example.com/feed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Daily Bugle");

    let (status, _, _) = send(&app, Method::DELETE, &uri, Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = send(&app, Method::GET, &uri, Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_provider_validation() {
    let app = test_app().await;
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/content-providers",
        Some(TOKEN),
        Some(json!({"name": " ", "endpoint_url": "not a url"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(body["details"]["name"].is_string());
    assert!(body["details"]["endpoint_url"].is_string());

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/content-providers",
        Some(TOKEN),
        Some(json!({"name": "x".repeat(255), "endpoint_url": "https://ok.example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_content_requires_existing_provider_and_unique_title() {
    let app = test_app().await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/contents",
        Some(TOKEN),
        Some(content_body(999, "Orphan")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["provider_id"].is_string());

    let provider_id = create_provider(&app, "Partner").await;
    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/api/contents",
        Some(TOKEN),
        Some(content_body(provider_id, "Morning briefing")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let content_id = body["id"].as_i64().unwrap();
    assert_eq!(
        headers.get("location").unwrap().to_str().unwrap(),
        format!("/api/contents/{content_id}")
    );
    assert_eq!(body["about"], Value::Null);

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/contents",
        Some(TOKEN),
        Some(content_body(provider_id, "Morning briefing")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_content_list_paginates_and_filters() {
    let app = test_app().await;
    let first = create_provider(&app, "First").await;
    let second = create_provider(&app, "Second").await;

    for (provider, title) in [(first, "Alpha"), (first, "Beta"), (second, "Alpha")] {
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/contents",
            Some(TOKEN),
            Some(content_body(provider, title)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, page) = send(
        &app,
        Method::GET,
        &format!("/api/contents?provider_id={first}&limit=1"),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"].as_array().unwrap().len(), 1);
    assert_eq!(page["data"][0]["title"], "Alpha");
    assert_eq!(page["has_more"], true);

    let cursor = page["next_cursor"].as_str().unwrap();
    let (_, _, page) = send(
        &app,
        Method::GET,
        &format!("/api/contents?provider_id={first}&limit=1&cursor={cursor}"),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(page["data"][0]["title"], "Beta");
    assert_eq!(page["has_more"], false);

    let (_, _, page) = send(
        &app,
        Method::GET,
        "/api/contents?search=Alph",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(page["data"].as_array().unwrap().len(), 2);

    let (status, _, _) = send(&app, Method::GET, "/api/contents?limit=500", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        Method::GET,
        "/api/contents?cursor=@@@",
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleting_provider_removes_its_contents() {
    let app = test_app().await;
    let provider_id = create_provider(&app, "Partner").await;
    let (_, _, body) = send(
        &app,
        Method::POST,
        "/api/contents",
        Some(TOKEN),
        Some(content_body(provider_id, "Doomed")),
    )
    .await;
    let content_uri = format!("/api/contents/{}", body["id"]);

    let (status, _, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/content-providers/{provider_id}"),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, Method::GET, &content_uri, Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_dispatch_enqueues_one_job_per_provider() {
    let mut app = test_app().await;
    let first = create_provider(&app, "First").await;
    let second = create_provider(&app, "Second").await;

    let (status, _, body) = send(&app, Method::POST, "/api/ingest/dispatch", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["jobs_enqueued"], 2);

    let mut provider_ids = vec![
        app.jobs.recv().await.unwrap().provider_id,
        app.jobs.recv().await.unwrap().provider_id,
    ];
    provider_ids.sort();
    assert_eq!(provider_ids, vec![first as i32, second as i32]);

    let (status, _, runs) = send(&app, Method::GET, "/api/ingest/runs", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs, json!([]));
}

#[tokio::test]
async fn test_manual_dispatch_returns_503_when_queue_is_full() {
    let app = test_app_with_queue(1).await;
    create_provider(&app, "First").await;
    create_provider(&app, "Second").await;

    let (status, _, body) = send(&app, Method::POST, "/api/ingest/dispatch", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = test_app().await;
    let (status, _, body) = send(&app, Method::GET, "/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/contents"].is_object());
    assert!(body["paths"]["/api/ingest/dispatch"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}
