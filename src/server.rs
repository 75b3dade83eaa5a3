//! # Server Configuration
//!
//! Router assembly and process lifecycle: the HTTP API, the ingest worker pool
//! and the ingest scheduler share one cancellation token.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers::{self, contents, ingest, providers};
use crate::ingest::{
    DEFAULT_QUEUE_CAPACITY, Dispatcher, IngestScheduler, IngestWorker, Schedule, WorkerPool,
    job_queue,
};
use crate::repositories::ProviderRepository;
use crate::telemetry::{TRACE_ID_HEADER, TraceContext, with_trace_context};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub dispatcher: Dispatcher,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/content-providers",
            get(providers::list_providers).post(providers::create_provider),
        )
        .route(
            "/content-providers/{id}",
            get(providers::get_provider)
                .put(providers::update_provider)
                .delete(providers::delete_provider),
        )
        .route(
            "/contents",
            get(contents::list_contents).post(contents::create_content),
        )
        .route(
            "/contents/{id}",
            get(contents::get_content)
                .put(contents::update_content)
                .delete(contents::delete_content),
        )
        .route("/ingest/dispatch", post(ingest::dispatch))
        .route("/ingest/runs", get(ingest::list_runs))
        .route_layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/api", api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Scopes each request to a trace id and echoes it back in `x-trace-id`
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let context = TraceContext::from_headers(request.headers());
    let trace_id = context.trace_id.clone();
    request.extensions_mut().insert(context.clone());

    let mut response = with_trace_context(context, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

/// Starts the API, worker pool and scheduler, and runs until a shutdown signal
pub async fn run_server(config: Arc<AppConfig>, db: DatabaseConnection) -> anyhow::Result<()> {
    let db = Arc::new(db);
    let shutdown = CancellationToken::new();

    let (queue, receiver) = job_queue(DEFAULT_QUEUE_CAPACITY);
    let dispatcher = Dispatcher::new(ProviderRepository::new(db.clone()), queue);

    let worker = Arc::new(
        IngestWorker::new(db.clone(), config.ingest.clone())
            .context("failed to build ingest HTTP client")?,
    );
    let pool = WorkerPool::new(worker, config.ingest.worker_concurrency);
    let pool_handle = tokio::spawn(pool.run(receiver, shutdown.child_token()));

    let scheduler_handle = if config.ingest.enabled {
        let schedule = Schedule::from_config(&config.ingest)?;
        let scheduler = IngestScheduler::new(dispatcher.clone(), schedule);
        Some(tokio::spawn(scheduler.run(shutdown.child_token())))
    } else {
        info!("Ingest scheduler disabled; dispatch only via API or CLI");
        None
    };

    let state = AppState {
        config: config.clone(),
        db,
        dispatcher,
    };
    let app = create_app(state);

    let addr = config
        .bind_addr()
        .with_context(|| format!("invalid server address '{}'", config.api_bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, profile = %config.profile, "Server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler_handle {
        let _ = handle.await;
    }
    let _ = pool_handle.await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT or operator token")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::providers::list_providers,
        crate::handlers::providers::create_provider,
        crate::handlers::providers::get_provider,
        crate::handlers::providers::update_provider,
        crate::handlers::providers::delete_provider,
        crate::handlers::contents::list_contents,
        crate::handlers::contents::create_content,
        crate::handlers::contents::get_content,
        crate::handlers::contents::update_content,
        crate::handlers::contents::delete_content,
        crate::handlers::ingest::dispatch,
        crate::handlers::ingest::list_runs,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::providers::ProviderRequest,
            crate::handlers::providers::ProviderResponse,
            crate::handlers::contents::ContentRequest,
            crate::handlers::contents::ContentResponse,
            crate::handlers::ingest::DispatchResponse,
            crate::handlers::ingest::IngestRunResponse,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "News Feed Content API",
        description = "Content providers, ingested contents and the ingestion pipeline",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
