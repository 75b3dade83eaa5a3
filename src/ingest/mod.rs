//! # Content Ingestion
//!
//! Scheduled fetch-and-ingest pipeline: the scheduler fires the dispatcher,
//! the dispatcher enqueues one job per provider, and the worker pool runs each
//! job through the [`IngestWorker`].

pub mod dispatcher;
pub mod payload;
pub mod pool;
pub mod scheduler;
pub mod worker;

pub use dispatcher::{DEFAULT_QUEUE_CAPACITY, Dispatcher, JobQueue, JobReceiver, job_queue};
pub use pool::WorkerPool;
pub use scheduler::{IngestScheduler, Schedule};
pub use worker::{IngestError, IngestHeaders, IngestJob, IngestSummary, IngestWorker};
