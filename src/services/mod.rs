//! Service layer for business logic operations.

mod notification_job_service;
pub mod notifications;

pub use notification_job_service::{DEFAULT_AUDIENCE, JobDraft, NotificationJobService};

use std::sync::Arc;

use crate::dispatch::{Clock, NotificationJobStore};

/// Aggregates all services for use as Axum application state.
#[derive(Clone)]
pub struct Services {
    pub notification_jobs: NotificationJobService,
}

impl Services {
    pub fn new(store: Arc<dyn NotificationJobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            notification_jobs: NotificationJobService::new(store, clock),
        }
    }
}
