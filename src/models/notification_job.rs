//! Scheduled notification job model.
//!
//! A job is created by the scheduling actor, claimed by the dispatch loop and
//! reaches exactly one terminal state (or is cancelled while still pending).

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::notification_jobs;

// ============================================================================
// Enums
// ============================================================================

/// Delivery channel of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, ToSchema)]
#[db_enum(existing_type_path = "crate::schema::sql_types::JobKind")]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Push,
    Email,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Push => write!(f, "push"),
            JobKind::Email => write!(f, "email"),
        }
    }
}

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, ToSchema)]
#[db_enum(existing_type_path = "crate::schema::sql_types::JobStatus")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal jobs are never dispatched again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = notification_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationJob {
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
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl NotificationJob {
    /// Materialize a freshly inserted row, applying the table defaults.
    pub fn from_new(new: NewNotificationJob, created_at: DateTime<Utc>) -> Self {
        Self {
            id: new.id,
            kind: new.kind,
            title: new.title,
            body: new.body,
            url: new.url,
            html_content: new.html_content,
            audience: new.audience,
            activity_filter: new.activity_filter,
            scheduled_at: new.scheduled_at,
            status: JobStatus::Pending,
            sent_count: 0,
            failed_count: 0,
            total_count: 0,
            attempts: 0,
            created_by: new.created_by,
            error_message: None,
            created_at,
            claimed_at: None,
            processed_at: None,
        }
    }

    pub fn audience_descriptor(&self) -> AudienceDescriptor {
        AudienceDescriptor {
            audience: self.audience.clone(),
            activity_filter: self.activity_filter.clone(),
        }
    }

    /// Eligible for the processing transition at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.scheduled_at <= now
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notification_jobs)]
pub struct NewNotificationJob {
    pub id: Uuid,
    pub kind: JobKind,
    pub title: String,
    pub body: String,
    pub url: Option<String>,
    pub html_content: Option<String>,
    pub audience: String,
    pub activity_filter: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

/// Recipient selection forwarded verbatim to the channel senders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AudienceDescriptor {
    /// Audience tag such as "all", "paid" or a segment name
    pub audience: String,
    /// Optional activity window such as "active_7d"
    pub activity_filter: Option<String>,
}
