//! Approval prompts via a generic JSON webhook.
//!
//! Useful for chat platforms with incoming-webhook support and for
//! browser-based approval UIs during local development; the payload carries
//! both callback tokens so the receiver can relay the decision through any
//! ingress.

use async_trait::async_trait;
use keyward_core::CallbackData;
use reqwest::Url;
use tracing::debug;

use crate::error::{ChannelError, ChannelResult};
use crate::{ApprovalPrompt, MessageHandle, NotifyChannel};

/// Notification channel that POSTs prompts to a configured URL.
pub struct WebhookChannel {
    client: reqwest::Client,
    url: Url,
}

impl WebhookChannel {
    /// Create a channel from its config section.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Config`] when the URL does not parse.
    pub fn new(config: &keyward_config::WebhookChannelConfig) -> ChannelResult<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| ChannelError::Config(format!("bad webhook url '{}': {e}", config.url)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }
}

#[async_trait]
impl NotifyChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send_prompt(&self, prompt: &ApprovalPrompt) -> ChannelResult<MessageHandle> {
        let body = serde_json::json!({
            "type": "approval_request",
            "request_id": prompt.request_id.to_string(),
            "vault": prompt.vault,
            "item": prompt.item,
            "field": prompt.field,
            "reason": prompt.reason,
            "approve": CallbackData::Approve(prompt.request_id).to_string(),
            "deny": CallbackData::Deny(prompt.request_id).to_string(),
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| ChannelError::Send(e.to_string()))?;

        debug!(request_id = %prompt.request_id, "approval prompt posted");
        Ok(MessageHandle {
            channel: self.name().to_owned(),
            message_ref: prompt.request_id.to_string(),
        })
    }

    async fn update_outcome(
        &self,
        handle: &MessageHandle,
        approved: bool,
        prompt: &ApprovalPrompt,
    ) -> ChannelResult<()> {
        let body = serde_json::json!({
            "type": "approval_outcome",
            "request_id": handle.message_ref,
            "approved": approved,
            "item": prompt.item,
            "field": prompt.field,
            "vault": prompt.vault,
        });
        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Update(e.to_string()))?;
        response
            .error_for_status()
            .map(|_| ())
            .map_err(|e| ChannelError::Update(e.to_string()))
    }

    async fn validate(&self) -> ChannelResult<()> {
        // The endpoint may legitimately reject empty probes; reachability is
        // only checked at send time. Parsing the URL already happened in the
        // constructor.
        Ok(())
    }
}

impl std::fmt::Debug for WebhookChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookChannel")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}
