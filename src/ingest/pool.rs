//! Worker pool draining the ingestion job queue.

use std::sync::Arc;

use metrics::gauge;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::ingest::dispatcher::JobReceiver;
use crate::ingest::worker::IngestWorker;

/// Runs queued jobs concurrently, at most `concurrency` at a time
pub struct WorkerPool {
    worker: Arc<IngestWorker>,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(worker: Arc<IngestWorker>, concurrency: usize) -> Self {
        Self {
            worker,
            concurrency: concurrency.max(1),
        }
    }

    /// Drain the queue until it closes or shutdown fires, then wait for
    /// in-flight jobs to finish. Shutdown also cancels running jobs.
    #[instrument(skip_all, fields(concurrency = self.concurrency))]
    pub async fn run(self, mut receiver: JobReceiver, shutdown: CancellationToken) {
        info!("Starting ingest worker pool");
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let worker = self.worker.clone();
            let job_shutdown = shutdown.child_token();
            gauge!("ingest_jobs_in_flight").increment(1.0);
            tokio::spawn(async move {
                let _permit = permit;
                let provider_id = job.provider_id;
                match worker.run_until_cancelled(job, &job_shutdown).await {
                    Ok(summary) => debug!(
                        provider_id,
                        pages = summary.pages_fetched,
                        items = summary.items_upserted,
                        "Ingest job finished"
                    ),
                    Err(err) => error!(provider_id, error = %err, "Ingest job failed"),
                }
                gauge!("ingest_jobs_in_flight").decrement(1.0);
            });
        }

        // Stop taking new work, then wait for running jobs to release their permits
        receiver.close();
        let _ = semaphore.acquire_many(self.concurrency as u32).await;
        info!("Ingest worker pool stopped");
    }
}
