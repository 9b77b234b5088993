//! Repository layer for data access operations.

mod notification_job_repo;

pub use notification_job_repo::NotificationJobRepository;
