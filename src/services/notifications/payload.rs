//! Channel payload construction.

use serde_json::{Value, json};

use crate::models::{AudienceDescriptor, JobKind, NotificationJob};

/// Notification tag, lets devices collapse re-sent pushes.
pub fn push_tag(job: &NotificationJob) -> String {
    format!("scheduled-{}", job.id)
}

/// Build the JSON body sent to the channel sender for `job`.
///
/// The audience descriptor is copied through untouched; the sender resolves it.
pub fn build_payload(job: &NotificationJob) -> Value {
    let AudienceDescriptor {
        audience,
        activity_filter,
    } = job.audience_descriptor();

    match job.kind {
        JobKind::Push => json!({
            "audience": audience,
            "activityFilter": activity_filter,
            "hasPushFilter": true,
            "title": job.title,
            "body": job.body,
            "url": job.url,
            "tag": push_tag(job),
        }),
        JobKind::Email => json!({
            "audience": audience,
            "activityFilter": activity_filter,
            "hasEmailFilter": true,
            "subject": job.title,
            "htmlContent": job.html_content.as_deref().unwrap_or(&job.body),
            "textContent": job.body,
        }),
    }
}
