//! # News Feed Content Main Entry Point

use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use news_feed_content::{
    cli::{self, Cli, Command},
    config::ConfigLoader,
    db::{init_pool, run_migrations},
    server::run_server,
    telemetry::init_tracing,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = Arc::new(ConfigLoader::new().load()?);
    init_tracing(&config)?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;

    match cli.command() {
        Command::Serve { skip_migrations } => {
            if !skip_migrations {
                run_migrations(&db).await?;
            }
            run_server(config, db).await
        }
        Command::Migrate => {
            run_migrations(&db).await?;
            info!("Migrations applied");
            Ok(())
        }
        Command::IngestOnce { provider_id } => {
            let report = cli::ingest_once(Arc::new(db), config.ingest.clone(), provider_id).await?;
            for summary in &report.succeeded {
                info!(
                    provider_id = summary.provider_id,
                    pages = summary.pages_fetched,
                    items = summary.items_upserted,
                    truncated = summary.truncated,
                    "Provider ingested"
                );
            }
            for (provider_id, err) in &report.failed {
                error!(provider_id, error = %err, "Provider ingestion failed");
            }
            if !report.failed.is_empty() {
                bail!(
                    "{} of {} providers failed to ingest",
                    report.failed.len(),
                    report.failed.len() + report.succeeded.len()
                );
            }
            Ok(())
        }
    }
}
