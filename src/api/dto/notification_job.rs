//! Notification job DTOs for the scheduling API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{JobKind, JobStatus, NotificationJob};
use crate::services::JobDraft;

use super::PaginationParams;

// ============================================================================
// Request DTOs
// ============================================================================

/// Request body for scheduling a notification job.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[schema(example = json!({
    "kind": "push",
    "title": "Weekend deals",
    "body": "Fresh produce is 20% off until Sunday",
    "url": "/deals",
    "audience": "paid",
    "activity_filter": "active_7d",
    "scheduled_at": "2026-07-10T18:30:00Z"
}))]
pub struct CreateNotificationJobRequest {
    pub kind: JobKind,

    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Body is required"))]
    pub body: String,

    #[validate(length(max = 2048, message = "URL must be at most 2048 characters"))]
    pub url: Option<String>,

    pub html_content: Option<String>,

    /// Audience tag, `all` when omitted
    #[validate(length(max = 100, message = "Audience must be at most 100 characters"))]
    #[schema(example = "all")]
    pub audience: Option<String>,

    #[validate(length(max = 100, message = "Activity filter must be at most 100 characters"))]
    pub activity_filter: Option<String>,

    /// Dispatch time, now when omitted
    pub scheduled_at: Option<DateTime<Utc>>,

    #[validate(length(max = 255, message = "Creator must be at most 255 characters"))]
    pub created_by: Option<String>,
}

impl CreateNotificationJobRequest {
    pub fn into_draft(self) -> JobDraft {
        JobDraft {
            kind: self.kind,
            title: self.title,
            body: self.body,
            url: self.url,
            html_content: self.html_content,
            audience: self.audience,
            activity_filter: self.activity_filter,
            scheduled_at: self.scheduled_at,
            created_by: self.created_by,
        }
    }
}

/// Query parameters for listing jobs.
#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct ListNotificationJobsQuery {
    /// Only return jobs in this status
    #[param(inline)]
    pub status: Option<JobStatus>,

    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    #[param(minimum = 1, example = 1)]
    pub page: u32,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    #[param(minimum = 1, maximum = 100, example = 20)]
    pub page_size: u32,
}

impl ListNotificationJobsQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

fn default_page() -> u32 {
    PaginationParams::default().page
}

fn default_page_size() -> u32 {
    PaginationParams::default().page_size
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationJobResponse {
    pub id: Uuid,
    pub kind: JobKind,
    pub title: String,
    pub body: String,
    pub url: Option<String>,
    pub html_content: Option<String>,
    pub audience: String,
    pub activity_filter: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: JobStatus,
    pub sent_count: i32,
    pub failed_count: i32,
    pub total_count: i32,
    pub attempts: i32,
    pub created_by: Option<String>,
    /// Set only when `status` is `failed`
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<NotificationJob> for NotificationJobResponse {
    fn from(job: NotificationJob) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            title: job.title,
            body: job.body,
            url: job.url,
            html_content: job.html_content,
            audience: job.audience,
            activity_filter: job.activity_filter,
            scheduled_at: job.scheduled_at,
            status: job.status,
            sent_count: job.sent_count,
            failed_count: job.failed_count,
            total_count: job.total_count,
            attempts: job.attempts,
            created_by: job.created_by,
            error_message: job.error_message,
            created_at: job.created_at,
            processed_at: job.processed_at,
        }
    }
}
