//! Command line interface.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use tracing::{error, info};

use crate::config::IngestConfig;
use crate::ingest::{IngestError, IngestJob, IngestSummary, IngestWorker};
use crate::repositories::ProviderRepository;

#[derive(Debug, Parser)]
#[command(name = "news-feed-content", version, about = "News feed content API and ingester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP API with the ingest scheduler and worker pool (default)
    Serve {
        /// Do not apply pending migrations on startup
        #[arg(long)]
        skip_migrations: bool,
    },
    /// Fetch and store every provider's content once, then exit
    IngestOnce {
        /// Only ingest this provider
        #[arg(long)]
        provider_id: Option<i32>,
    },
    /// Apply pending database migrations and exit
    Migrate,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            skip_migrations: false,
        })
    }
}

/// Outcome of a one-shot ingestion pass
#[derive(Debug, Default)]
pub struct IngestOnceReport {
    pub succeeded: Vec<IngestSummary>,
    pub failed: Vec<(i32, IngestError)>,
}

/// Runs the worker inline for each provider, one after another
pub async fn ingest_once(
    db: Arc<DatabaseConnection>,
    config: IngestConfig,
    provider_id: Option<i32>,
) -> Result<IngestOnceReport> {
    let provider_ids = match provider_id {
        Some(id) => vec![id],
        None => ProviderRepository::new(db.clone())
            .list_all()
            .await?
            .into_iter()
            .map(|provider| provider.id)
            .collect(),
    };

    let worker = IngestWorker::new(db.clone(), config)?;
    let providers = ProviderRepository::new(db);
    let mut report = IngestOnceReport::default();

    for id in provider_ids {
        let job = match providers.find_by_id(id).await? {
            Some(provider) => IngestJob::for_provider(&provider),
            None => {
                error!(provider_id = id, "Content provider not found");
                report.failed.push((id, IngestError::ProviderNotFound(id)));
                continue;
            }
        };

        match worker.run(job).await {
            Ok(summary) => report.succeeded.push(summary),
            Err(err) => report.failed.push((id, err)),
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "One-shot ingestion finished"
    );
    Ok(report)
}
