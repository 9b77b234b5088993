//! HTTP channel sender.
//!
//! POSTs the channel payload to the configured broadcast endpoint using the
//! global `HTTP_CLIENT`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::provider::{ChannelRequest, ChannelSender, SendOutcome, SendTally};
use crate::dispatch::DispatchError;
use crate::external::client::HTTP_CLIENT;

/// Header carrying the identity of the job's creator
pub const USER_ID_HEADER: &str = "x-basket-user-id";

pub struct HttpChannelSender {
    name: &'static str,
    url: String,
    service_token: Option<String>,
    timeout: Duration,
}

impl HttpChannelSender {
    pub fn new(
        name: &'static str,
        url: impl Into<String>,
        service_token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            url: url.into(),
            service_token,
            timeout,
        }
    }
}

#[async_trait]
impl ChannelSender for HttpChannelSender {
    async fn send(&self, request: &ChannelRequest) -> Result<SendOutcome, DispatchError> {
        let mut builder = HTTP_CLIENT
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request.payload);

        if let Some(ref token) = self.service_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref user_id) = request.created_by {
            builder = builder.header(USER_ID_HEADER, user_id);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(
            channel = self.name,
            job_id = %request.job_id,
            status = status.as_u16(),
            "Channel sender responded"
        );

        if status.is_success() {
            let tally: SendTally = serde_json::from_str(&body).map_err(|e| {
                DispatchError::InvalidResponse(format!("expected {{sent, failed, total}}: {}", e))
            })?;
            Ok(SendOutcome::Delivered(tally))
        } else {
            Ok(SendOutcome::Rejected {
                status: status.as_u16(),
                message: extract_error_message(status, &body),
            })
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Error text from a non-ok sender response.
///
/// Tries the JSON `error` field, then `message`, then the raw body, then
/// falls back to `HTTP <status>`.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["error", "message"] {
            if let Some(text) = map.get(field).and_then(Value::as_str)
                && !text.is_empty()
            {
                return text.to_string();
            }
        }
    }

    let raw = body.trim();
    if raw.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        raw.to_string()
    }
}
