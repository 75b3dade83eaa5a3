//! # Ingest Scheduler
//!
//! Background task that fires the dispatcher once a day at a configured UTC
//! time, or on a fixed interval when no time of day is configured.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use metrics::{counter, histogram};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::{ConfigError, IngestConfig};
use crate::ingest::dispatcher::Dispatcher;

/// When the dispatcher fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every day at this UTC time
    Daily(NaiveTime),
    Every(Duration),
}

impl Schedule {
    pub fn from_config(config: &IngestConfig) -> Result<Self, ConfigError> {
        Ok(match config.run_at_time()? {
            Some(time) => Self::Daily(time),
            None => Self::Every(Duration::seconds(
                i64::try_from(config.interval_seconds).unwrap_or(86_400),
            )),
        })
    }

    /// First fire time strictly after `now`
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Self::Daily(time) => {
                let today = now.date_naive().and_time(time).and_utc();
                if today > now {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            Self::Every(interval) => now + interval,
        }
    }
}

/// Background scheduler service.
pub struct IngestScheduler {
    dispatcher: Dispatcher,
    schedule: Schedule,
}

impl IngestScheduler {
    pub fn new(dispatcher: Dispatcher, schedule: Schedule) -> Self {
        Self {
            dispatcher,
            schedule,
        }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(schedule = ?self.schedule, "Starting ingest scheduler");

        loop {
            let now = Utc::now();
            let next = self.schedule.next_fire_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_fire_at = %next, "Next ingest dispatch scheduled");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Ingest scheduler shutdown requested");
                    break;
                }
                _ = sleep(wait) => {
                    let started = Instant::now();
                    match self.dispatcher.dispatch().await {
                        Ok(jobs) => info!(jobs, "Scheduled ingest dispatch completed"),
                        Err(err) => {
                            counter!("ingest_dispatch_failures_total").increment(1);
                            error!(error = %err, "Scheduled ingest dispatch failed");
                        }
                    }
                    histogram!("ingest_dispatch_duration_ms")
                        .record(started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Ingest scheduler stopped");
    }
}
