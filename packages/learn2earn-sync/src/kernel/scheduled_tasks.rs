//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! One task: the daily Learn2Earn status sync.
//!
//! ```text
//! Scheduler (daily, configured time zone)
//!     │
//!     └─► run_with_retries(max_attempts)
//!             └─► StatusSynchronizer::run_sync()
//! ```
//!
//! A failed run is retried from scratch after `retry_delay`, up to
//! `max_attempts` runs per trigger. There is no checkpointing between attempts.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::SyncDeps;
use crate::config::SyncConfig;
use crate::domains::learn2earn::{StatusSynchronizer, SyncError, SyncReport};

/// Start all scheduled tasks
pub async fn start_scheduler(deps: SyncDeps, config: &SyncConfig) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sync = Arc::new(StatusSynchronizer::new(&deps, config.completion_policy));
    let max_attempts = config.max_attempts;
    let retry_delay = config.retry_delay;

    let sync_job = Job::new_async_tz(
        config.schedule.as_str(),
        config.timezone,
        move |_uuid, _lock| {
            let sync = sync.clone();
            Box::pin(async move {
                if let Err(e) = run_with_retries(&sync, max_attempts, retry_delay).await {
                    tracing::error!(
                        "Learn2Earn status sync task failed: {:#}",
                        anyhow::Error::from(e)
                    );
                }
            })
        },
    )?;

    scheduler.add(sync_job).await?;
    scheduler.start().await?;

    tracing::info!(
        schedule = %config.schedule,
        timezone = %config.timezone,
        max_attempts,
        "Scheduled tasks started (Learn2Earn status sync)"
    );
    Ok(scheduler)
}

/// Run the sync, retrying the whole run on failure.
///
/// Returns the report of the first successful attempt, or the error of the
/// last one.
pub async fn run_with_retries(
    sync: &StatusSynchronizer,
    max_attempts: u32,
    retry_delay: Duration,
) -> Result<SyncReport, SyncError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match sync.run_sync().await {
            Ok(report) => return Ok(report),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    "Learn2Earn status sync attempt failed, retrying: {:#}",
                    anyhow::Error::from(e)
                );
                attempt += 1;
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
