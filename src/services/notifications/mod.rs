//! Push and email channel senders.

mod http_sender;
pub mod payload;
mod provider;

pub use http_sender::{HttpChannelSender, USER_ID_HEADER, extract_error_message};
pub use provider::{ChannelRequest, ChannelSender, SendOutcome, SendTally};

use std::sync::Arc;

use crate::config::ChannelsConfig;
use crate::models::JobKind;

/// Sender per job kind. A kind without a configured endpoint has no sender.
#[derive(Clone, Default)]
pub struct ChannelSenders {
    push: Option<Arc<dyn ChannelSender>>,
    email: Option<Arc<dyn ChannelSender>>,
}

impl ChannelSenders {
    pub fn new(
        push: Option<Arc<dyn ChannelSender>>,
        email: Option<Arc<dyn ChannelSender>>,
    ) -> Self {
        Self { push, email }
    }

    /// HTTP senders for every non-empty URL in the channels section.
    pub fn from_config(config: &ChannelsConfig) -> Self {
        let build = |name: &'static str, url: &str| -> Option<Arc<dyn ChannelSender>> {
            if url.is_empty() {
                tracing::warn!(channel = name, "Channel URL not configured, jobs of this kind will fail");
                return None;
            }
            Some(Arc::new(HttpChannelSender::new(
                name,
                url,
                config.service_token(),
                config.timeout(),
            )))
        };

        Self {
            push: build("push", &config.push_url),
            email: build("email", &config.email_url),
        }
    }

    pub fn for_kind(&self, kind: JobKind) -> Option<&Arc<dyn ChannelSender>> {
        match kind {
            JobKind::Push => self.push.as_ref(),
            JobKind::Email => self.email.as_ref(),
        }
    }
}
