//! Dispatch command handler
//!
//! Runs a single batch for deployments that drive dispatch from an external
//! scheduler instead of the HTTP trigger.

use std::sync::Arc;

use crate::config::Settings;
use crate::db::establish_async_connection_pool;
use crate::dispatch::{
    BatchSummary, Clock, DispatchError, Dispatcher, DispatcherConfig, NotificationJobStore,
    SystemClock,
};
use crate::models::NotificationJob;
use crate::repositories::NotificationJobRepository;
use crate::services::notifications::ChannelSenders;

/// Result of a `dispatch` invocation.
#[derive(Debug)]
pub enum DispatchRun {
    /// `--dry-run`: jobs that would be claimed, nothing changed
    Preview(Vec<NotificationJob>),
    Completed(BatchSummary),
}

pub struct DispatchCommandHandler {
    config: Settings,
}

impl DispatchCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Connects to the job store and runs (or previews) one batch.
    pub async fn execute(&self, dry_run: bool) -> Result<DispatchRun, DispatchError> {
        let pool = establish_async_connection_pool(&self.config.database).await?;
        let store: Arc<dyn NotificationJobStore> = Arc::new(NotificationJobRepository::new(pool));
        self.execute_with(store, Arc::new(SystemClock), dry_run).await
    }

    async fn execute_with(
        &self,
        store: Arc<dyn NotificationJobStore>,
        clock: Arc<dyn Clock>,
        dry_run: bool,
    ) -> Result<DispatchRun, DispatchError> {
        if dry_run {
            let due = store
                .fetch_due(clock.now(), i64::from(self.config.dispatch.batch_size))
                .await?;
            print_preview(&due);
            return Ok(DispatchRun::Preview(due));
        }

        let dispatcher = Dispatcher::new(
            store,
            ChannelSenders::from_config(&self.config.channels),
            clock,
            DispatcherConfig::from(&self.config.dispatch),
        );
        let summary = dispatcher.run_batch().await?;

        println!(
            "✓ Dispatch finished: processed={} completed={} failed={} skipped={} requeued={} abandoned={}",
            summary.processed,
            summary.completed,
            summary.failed,
            summary.skipped,
            summary.requeued,
            summary.abandoned
        );
        Ok(DispatchRun::Completed(summary))
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

fn print_preview(due: &[NotificationJob]) {
    if due.is_empty() {
        println!("✓ No due notification jobs");
        return;
    }

    println!("Found {} due notification job(s):", due.len());
    for job in due {
        println!(
            "  - {} [{}] '{}' audience={} scheduled_at={}",
            job.id,
            job.kind,
            job.title,
            job.audience,
            job.scheduled_at.to_rfc3339()
        );
    }
    println!("\nRun without --dry-run to dispatch these jobs");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{FixedClock, MemoryJobStore};
    use crate::models::{JobKind, JobStatus, NewNotificationJob};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 10, 18, 30, 0).unwrap()
    }

    async fn seeded_store() -> Arc<MemoryJobStore> {
        let store = Arc::new(MemoryJobStore::new());
        let job = NotificationJob::from_new(
            NewNotificationJob {
                id: Uuid::new_v4(),
                kind: JobKind::Email,
                title: "Your weekly plan".to_string(),
                body: "Five dinners".to_string(),
                url: None,
                html_content: None,
                audience: "all".to_string(),
                activity_filter: None,
                scheduled_at: now() - Duration::minutes(5),
                created_by: None,
            },
            now() - Duration::hours(1),
        );
        store.insert(job).await;
        store
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let store = seeded_store().await;
        let handler = DispatchCommandHandler::new(Settings::default());

        let run = handler
            .execute_with(store.clone(), Arc::new(FixedClock::new(now())), true)
            .await
            .unwrap();

        assert!(matches!(run, DispatchRun::Preview(ref jobs) if jobs.len() == 1));
        assert_eq!(store.all().await[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_run_without_channels_fails_the_job() {
        let store = seeded_store().await;
        let handler = DispatchCommandHandler::new(Settings::default());

        let run = handler
            .execute_with(store.clone(), Arc::new(FixedClock::new(now())), false)
            .await
            .unwrap();

        match run {
            DispatchRun::Completed(summary) => {
                assert_eq!(summary.processed, 1);
                assert_eq!(summary.failed, 1);
            }
            other => panic!("Expected a completed batch, got {:?}", other),
        }
        assert_eq!(store.all().await[0].status, JobStatus::Failed);
    }
}
