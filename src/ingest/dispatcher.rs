//! Fetch Dispatcher
//!
//! Lists every registered provider and enqueues one independent ingestion job
//! per provider onto the in-process queue.

use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, instrument, warn};

use crate::ingest::worker::{IngestError, IngestJob};
use crate::repositories::ProviderRepository;

/// Default capacity of the in-process job channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Sending half of the ingestion job queue
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<IngestJob>,
}

/// Receiving half, drained by the worker pool
pub type JobReceiver = mpsc::Receiver<IngestJob>;

/// Create a bounded job queue
pub fn job_queue(capacity: usize) -> (JobQueue, JobReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (JobQueue { sender }, receiver)
}

impl JobQueue {
    /// Push a job, waiting for room when the queue is full
    pub async fn enqueue(&self, job: IngestJob) -> Result<(), IngestError> {
        self.sender
            .send(job)
            .await
            .map_err(|_| IngestError::QueueClosed)
    }

    /// Push a job without waiting; a full queue is an error
    pub fn try_enqueue(&self, job: IngestJob) -> Result<(), IngestError> {
        self.sender.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => IngestError::QueueFull,
            TrySendError::Closed(_) => IngestError::QueueClosed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Enumerates providers and fans jobs out to the queue
#[derive(Debug, Clone)]
pub struct Dispatcher {
    providers: ProviderRepository,
    queue: JobQueue,
}

impl Dispatcher {
    pub fn new(providers: ProviderRepository, queue: JobQueue) -> Self {
        Self { providers, queue }
    }

    /// Enqueue one job per provider; returns the number of jobs enqueued
    ///
    /// Waits for queue room but not for the jobs to run.
    #[instrument(skip(self))]
    pub async fn dispatch(&self) -> Result<usize, IngestError> {
        let providers = self
            .providers
            .list_all()
            .await
            .map_err(IngestError::database)?;

        let mut enqueued = 0;
        for provider in &providers {
            self.queue.enqueue(IngestJob::for_provider(provider)).await?;
            enqueued += 1;
        }

        record_dispatch(enqueued);
        Ok(enqueued)
    }

    /// Like [`Dispatcher::dispatch`] but never waits for queue room
    ///
    /// Fails with [`IngestError::QueueFull`] at the first provider that does
    /// not fit; jobs enqueued before it stay queued.
    #[instrument(skip(self))]
    pub async fn try_dispatch(&self) -> Result<usize, IngestError> {
        let providers = self
            .providers
            .list_all()
            .await
            .map_err(IngestError::database)?;

        let mut enqueued = 0;
        for provider in &providers {
            if let Err(err) = self.queue.try_enqueue(IngestJob::for_provider(provider)) {
                warn!(enqueued, total = providers.len(), error = %err, "Dispatch stopped early");
                record_dispatch(enqueued);
                return Err(err);
            }
            enqueued += 1;
        }

        record_dispatch(enqueued);
        Ok(enqueued)
    }
}

fn record_dispatch(enqueued: usize) {
    counter!("ingest_jobs_dispatched_total").increment(enqueued as u64);
    info!(jobs = enqueued, "Dispatched ingestion jobs");
}
