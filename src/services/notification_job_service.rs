//! Scheduling and administration of notification jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dispatch::{Clock, NotificationJobStore};
use crate::error::{AppError, AppResult};
use crate::models::{JobKind, JobStatus, NewNotificationJob, NotificationJob};

/// Audience used when the scheduler does not name one
pub const DEFAULT_AUDIENCE: &str = "all";

/// Fields supplied by the scheduling actor.
#[derive(Debug, Clone)]
pub struct JobDraft {
    pub kind: JobKind,
    pub title: String,
    pub body: String,
    pub url: Option<String>,
    pub html_content: Option<String>,
    pub audience: Option<String>,
    pub activity_filter: Option<String>,
    /// Immediate dispatch when absent
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

#[derive(Clone)]
pub struct NotificationJobService {
    store: Arc<dyn NotificationJobStore>,
    clock: Arc<dyn Clock>,
}

impl NotificationJobService {
    pub fn new(store: Arc<dyn NotificationJobStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn schedule(&self, draft: JobDraft) -> AppResult<NotificationJob> {
        let now = self.clock.now();
        let job = NewNotificationJob {
            id: Uuid::new_v4(),
            kind: draft.kind,
            title: draft.title,
            body: draft.body,
            url: draft.url,
            html_content: draft.html_content,
            audience: draft
                .audience
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
            activity_filter: draft.activity_filter,
            scheduled_at: draft.scheduled_at.unwrap_or(now),
            created_by: draft.created_by,
        };

        let job = self.store.create(job, now).await?;
        tracing::info!(job_id = %job.id, kind = %job.kind, scheduled_at = %job.scheduled_at, "Notification job scheduled");
        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<NotificationJob> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::job_not_found(id))
    }

    pub async fn list(
        &self,
        status: Option<JobStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<NotificationJob>, i64)> {
        self.store.list(status, offset, limit).await
    }

    /// Cancel a job that has not been picked up yet.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `Conflict` when the job is no longer pending.
    pub async fn cancel(&self, id: Uuid) -> AppResult<NotificationJob> {
        if let Some(job) = self.store.cancel(id, self.clock.now()).await? {
            tracing::info!(job_id = %id, "Notification job cancelled");
            return Ok(job);
        }

        let job = self.get(id).await?;
        Err(AppError::Conflict {
            message: format!(
                "Job {} is {}; only pending jobs can be cancelled",
                id, job.status
            ),
        })
    }
}
