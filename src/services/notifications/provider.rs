//! Channel sender capability.
//!
//! The dispatch loop only knows this trait; the HTTP implementation lives in
//! [`super::http_sender`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::DispatchError;
use crate::models::{JobKind, NotificationJob};

use super::payload;

/// Delivery counters reported by a channel sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTally {
    #[serde(default)]
    pub sent: i32,
    #[serde(default)]
    pub failed: i32,
    #[serde(default)]
    pub total: i32,
}

impl SendTally {
    /// `sent + failed <= total` with no negative counter.
    pub fn is_consistent(&self) -> bool {
        self.sent >= 0
            && self.failed >= 0
            && self.total >= 0
            && i64::from(self.sent) + i64::from(self.failed) <= i64::from(self.total)
    }

    pub fn check(self) -> Result<Self, DispatchError> {
        if self.is_consistent() {
            Ok(self)
        } else {
            Err(DispatchError::InconsistentTally {
                sent: self.sent,
                failed: self.failed,
                total: self.total,
            })
        }
    }
}

/// What a sender reported back for one broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered(SendTally),
    /// Non-ok response, carrying the extracted error message
    Rejected { status: u16, message: String },
}

/// One broadcast request: payload plus the creator identity to forward.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRequest {
    pub job_id: uuid::Uuid,
    pub kind: JobKind,
    pub payload: Value,
    pub created_by: Option<String>,
}

impl ChannelRequest {
    pub fn for_job(job: &NotificationJob) -> Self {
        Self {
            job_id: job.id,
            kind: job.kind,
            payload: payload::build_payload(job),
            created_by: job.created_by.clone(),
        }
    }
}

/// A push or email broadcast capability.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, request: &ChannelRequest) -> Result<SendOutcome, DispatchError>;

    /// Stable name used in logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_consistency() {
        let ok = SendTally {
            sent: 120,
            failed: 3,
            total: 123,
        };
        assert!(ok.is_consistent());
        assert!(ok.check().is_ok());

        let over = SendTally {
            sent: 10,
            failed: 2,
            total: 11,
        };
        assert!(matches!(
            over.check(),
            Err(DispatchError::InconsistentTally { sent: 10, failed: 2, total: 11 })
        ));

        let negative = SendTally {
            sent: -1,
            failed: 0,
            total: 0,
        };
        assert!(!negative.is_consistent());
    }

    #[test]
    fn test_tally_missing_fields_default_to_zero() {
        let tally: SendTally = serde_json::from_str(r#"{"sent": 4, "total": 4}"#).unwrap();
        assert_eq!(
            tally,
            SendTally {
                sent: 4,
                failed: 0,
                total: 4
            }
        );
    }
}
