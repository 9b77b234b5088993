//! Persistence seam of the dispatch loop.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{JobStatus, NewNotificationJob, NotificationJob};
use crate::services::notifications::SendTally;

/// Result of stale-claim recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaleRecovery {
    /// Returned to `pending`
    pub requeued: u32,
    /// Failed after exhausting `max_attempts`
    pub abandoned: u32,
}

/// Storage operations on `notification_jobs`.
///
/// Every state transition is conditional on the current status, so two
/// concurrent dispatchers can never both move a job out of `pending`.
#[async_trait]
pub trait NotificationJobStore: Send + Sync {
    /// Pending jobs with `scheduled_at <= now`, oldest first, at most `limit`.
    async fn fetch_due(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<NotificationJob>>;

    /// Compare-and-swap `pending -> processing`.
    ///
    /// Returns `None` when the job is no longer pending.
    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<NotificationJob>>;

    /// `processing -> completed` with the delivery counters.
    async fn complete(&self, id: Uuid, tally: SendTally, now: DateTime<Utc>) -> AppResult<bool>;

    /// `processing -> failed` with an error message.
    async fn fail(&self, id: Uuid, message: &str, now: DateTime<Utc>) -> AppResult<bool>;

    /// Requeue or abandon jobs stuck in `processing` since before `stale_before`.
    async fn reclaim_stale(
        &self,
        stale_before: DateTime<Utc>,
        max_attempts: i32,
        now: DateTime<Utc>,
    ) -> AppResult<StaleRecovery>;

    /// Insert a pending job stamped with `created_at = now`.
    async fn create(&self, job: NewNotificationJob, now: DateTime<Utc>) -> AppResult<NotificationJob>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NotificationJob>>;

    /// Newest-scheduled first, with the total row count for pagination.
    async fn list(
        &self,
        status: Option<JobStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<NotificationJob>, i64)>;

    /// Compare-and-swap `pending -> cancelled`.
    ///
    /// Returns `None` when the job is not pending.
    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<NotificationJob>>;

    /// Verify the store is reachable.
    async fn ping(&self) -> AppResult<()>;
}

/// Message recorded on jobs failed by stale-claim recovery.
pub(crate) fn abandoned_message(max_attempts: i32) -> String {
    format!("abandoned in processing after {} attempts", max_attempts)
}

/// In-memory store with the same transition rules as the database.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, NotificationJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully specified row.
    pub async fn insert(&self, job: NotificationJob) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn get(&self, id: Uuid) -> Option<NotificationJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn all(&self) -> Vec<NotificationJob> {
        let mut jobs: Vec<_> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|j| (j.scheduled_at, j.created_at, j.id));
        jobs
    }
}

#[async_trait]
impl NotificationJobStore for MemoryJobStore {
    async fn fetch_due(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<NotificationJob>> {
        let jobs = self.jobs.read().await;
        let mut due: Vec<_> = jobs.values().filter(|j| j.is_due(now)).cloned().collect();
        due.sort_by_key(|j| (j.scheduled_at, j.created_at, j.id));
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<NotificationJob>> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs
            .get_mut(&id)
            .filter(|j| j.status == JobStatus::Pending)
            .map(|job| {
                job.status = JobStatus::Processing;
                job.attempts += 1;
                job.claimed_at = Some(now);
                job.clone()
            }))
    }

    async fn complete(&self, id: Uuid, tally: SendTally, now: DateTime<Utc>) -> AppResult<bool> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Processing => {
                job.status = JobStatus::Completed;
                job.sent_count = tally.sent;
                job.failed_count = tally.failed;
                job.total_count = tally.total;
                job.processed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail(&self, id: Uuid, message: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Processing => {
                job.status = JobStatus::Failed;
                job.error_message = Some(message.to_string());
                job.processed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reclaim_stale(
        &self,
        stale_before: DateTime<Utc>,
        max_attempts: i32,
        now: DateTime<Utc>,
    ) -> AppResult<StaleRecovery> {
        let mut jobs = self.jobs.write().await;
        let mut recovery = StaleRecovery::default();

        let stale = jobs.values_mut().filter(|j| {
            j.status == JobStatus::Processing && j.claimed_at.is_none_or(|at| at < stale_before)
        });
        for job in stale {
            if job.attempts < max_attempts {
                job.status = JobStatus::Pending;
                job.claimed_at = None;
                recovery.requeued += 1;
            } else {
                job.status = JobStatus::Failed;
                job.error_message = Some(abandoned_message(max_attempts));
                job.processed_at = Some(now);
                recovery.abandoned += 1;
            }
        }

        Ok(recovery)
    }

    async fn create(&self, job: NewNotificationJob, now: DateTime<Utc>) -> AppResult<NotificationJob> {
        let job = NotificationJob::from_new(job, now);
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NotificationJob>> {
        Ok(self.get(id).await)
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<NotificationJob>, i64)> {
        let mut jobs: Vec<_> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            b.scheduled_at
                .cmp(&a.scheduled_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        let total = jobs.len() as i64;
        let page = jobs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<NotificationJob>> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs
            .get_mut(&id)
            .filter(|j| j.status == JobStatus::Pending)
            .map(|job| {
                job.status = JobStatus::Cancelled;
                job.processed_at = Some(now);
                job.clone()
            }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Store whose every call fails as if the database were down.
#[cfg(test)]
pub struct UnreachableJobStore;

#[cfg(test)]
impl UnreachableJobStore {
    fn down() -> crate::error::AppError {
        crate::error::AppError::ConnectionPool {
            source: anyhow::anyhow!("connection refused"),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl NotificationJobStore for UnreachableJobStore {
    async fn fetch_due(&self, _: DateTime<Utc>, _: i64) -> AppResult<Vec<NotificationJob>> {
        Err(Self::down())
    }
    async fn claim(&self, _: Uuid, _: DateTime<Utc>) -> AppResult<Option<NotificationJob>> {
        Err(Self::down())
    }
    async fn complete(&self, _: Uuid, _: SendTally, _: DateTime<Utc>) -> AppResult<bool> {
        Err(Self::down())
    }
    async fn fail(&self, _: Uuid, _: &str, _: DateTime<Utc>) -> AppResult<bool> {
        Err(Self::down())
    }
    async fn reclaim_stale(
        &self,
        _: DateTime<Utc>,
        _: i32,
        _: DateTime<Utc>,
    ) -> AppResult<StaleRecovery> {
        Err(Self::down())
    }
    async fn create(&self, _: NewNotificationJob, _: DateTime<Utc>) -> AppResult<NotificationJob> {
        Err(Self::down())
    }
    async fn find_by_id(&self, _: Uuid) -> AppResult<Option<NotificationJob>> {
        Err(Self::down())
    }
    async fn list(
        &self,
        _: Option<JobStatus>,
        _: i64,
        _: i64,
    ) -> AppResult<(Vec<NotificationJob>, i64)> {
        Err(Self::down())
    }
    async fn cancel(&self, _: Uuid, _: DateTime<Utc>) -> AppResult<Option<NotificationJob>> {
        Err(Self::down())
    }
    async fn ping(&self) -> AppResult<()> {
        Err(Self::down())
    }
}
