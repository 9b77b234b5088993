use thiserror::Error;

use crate::error::AppError;
use crate::models::JobKind;

/// Errors raised while dispatching a batch or a single job.
///
/// Per-job variants end up as the job's `error_message`; only `Store` can
/// abort a whole batch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] AppError),

    #[error("no {0} channel sender is configured")]
    ChannelNotConfigured(JobKind),

    #[error("channel request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid channel response: {0}")]
    InvalidResponse(String),

    #[error("inconsistent delivery tally: sent {sent} + failed {failed} exceeds total {total}")]
    InconsistentTally { sent: i32, failed: i32, total: i32 },

    #[error("failed to serialize channel payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl DispatchError {
    /// Message stored on the failed job.
    pub fn job_message(&self) -> String {
        match self {
            DispatchError::Store(e) => e.detailed_message(),
            other => other.to_string(),
        }
    }
}
