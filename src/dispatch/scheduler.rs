use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::dispatcher::Dispatcher;
use super::error::DispatchError;

/// In-process cron trigger driving [`Dispatcher::run_batch`].
pub struct DispatchScheduler {
    scheduler: Arc<Mutex<JobScheduler>>,
    dispatcher: Arc<Dispatcher>,
    schedule: String,
}

impl DispatchScheduler {
    pub async fn new(
        dispatcher: Arc<Dispatcher>,
        schedule: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| DispatchError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            dispatcher,
            schedule: schedule.into(),
        })
    }

    /// Register the dispatch job and start ticking.
    pub async fn start(&self) -> Result<(), DispatchError> {
        let dispatcher = Arc::clone(&self.dispatcher);

        let cron_job = Job::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let dispatcher = Arc::clone(&dispatcher);

            Box::pin(async move {
                match dispatcher.run_batch().await {
                    Ok(summary) if summary.processed > 0 => {
                        tracing::info!(processed = summary.processed, "Scheduled dispatch finished");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Scheduled dispatch failed"),
                }
            })
        })
        .map_err(|e| {
            DispatchError::Scheduler(format!("invalid cron expression '{}': {}", self.schedule, e))
        })?;

        let scheduler = self.scheduler.lock().await;
        scheduler
            .add(cron_job)
            .await
            .map_err(|e| DispatchError::Scheduler(e.to_string()))?;
        scheduler
            .start()
            .await
            .map_err(|e| DispatchError::Scheduler(e.to_string()))?;

        tracing::info!(schedule = %self.schedule, "Dispatch scheduler started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), DispatchError> {
        self.scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| DispatchError::Scheduler(e.to_string()))
    }
}
