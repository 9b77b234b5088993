mod notification_job;

pub use notification_job::{
    AudienceDescriptor, JobKind, JobStatus, NewNotificationJob, NotificationJob,
};
