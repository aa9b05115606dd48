//! Notification channel contract for the Keyward approval broker.
//!
//! A channel carries an approval prompt to a human and (best-effort)
//! updates the prompt with the final outcome. Any number of channels are
//! active simultaneously; the broker requires at least one successful
//! prompt send before suspending on a gated request.
//!
//! Channels do not deliver the *decision* — that arrives through the
//! callback ingresses (HTTP, drop directory, or a tailer feeding the
//! `ag:<verb>:<id>` token back). A channel's only obligations are to show
//! the prompt and to reflect the outcome.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod telegram;
mod webhook;

pub use error::{ChannelError, ChannelResult};
pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

use async_trait::async_trait;
use keyward_config::ChannelsSection;
use keyward_core::RequestId;
use std::sync::Arc;

/// Everything a channel needs to render an approval prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPrompt {
    /// The pending request this prompt belongs to.
    pub request_id: RequestId,
    /// Vault the secret lives in.
    pub vault: String,
    /// Item being requested.
    pub item: String,
    /// Field being requested.
    pub field: String,
    /// The caller's stated reason.
    pub reason: String,
}

/// Opaque handle to a delivered prompt message.
///
/// Returned by a successful [`NotifyChannel::send_prompt`] and consumed
/// exactly once, on final outcome, by [`NotifyChannel::update_outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle {
    /// Name of the channel that produced the handle.
    pub channel: String,
    /// Channel-private message reference.
    pub message_ref: String,
}

/// Uniform send-prompt + update-outcome contract over notification
/// backends.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// The channel's registry name.
    fn name(&self) -> &str;

    /// Deliver an approval prompt.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when the prompt could not be delivered;
    /// the broker tolerates per-channel failures as long as one channel
    /// succeeds.
    async fn send_prompt(&self, prompt: &ApprovalPrompt) -> ChannelResult<MessageHandle>;

    /// Reflect the final outcome on a previously delivered prompt.
    ///
    /// Best-effort: the broker ignores the result.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when the update could not be delivered.
    async fn update_outcome(
        &self,
        handle: &MessageHandle,
        approved: bool,
        prompt: &ApprovalPrompt,
    ) -> ChannelResult<()>;

    /// Check that the channel is usable. Called once at startup.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] describing why the channel is unusable.
    async fn validate(&self) -> ChannelResult<()>;
}

/// Construct every configured channel.
///
/// # Errors
///
/// Returns a [`ChannelError`] if a configured channel section is unusable
/// (e.g. an unparsable webhook URL).
pub fn build_channels(config: &ChannelsSection) -> ChannelResult<Vec<Arc<dyn NotifyChannel>>> {
    let mut channels: Vec<Arc<dyn NotifyChannel>> = Vec::new();
    if let Some(telegram) = &config.telegram {
        channels.push(Arc::new(TelegramChannel::new(telegram)));
    }
    if let Some(webhook) = &config.webhook {
        channels.push(Arc::new(WebhookChannel::new(webhook)?));
    }
    Ok(channels)
}
