//! Approval prompts via Telegram inline keyboards.

use async_trait::async_trait;
use keyward_core::CallbackData;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};
use tracing::debug;

use crate::error::{ChannelError, ChannelResult};
use crate::{ApprovalPrompt, MessageHandle, NotifyChannel};

/// Notification channel that prompts a Telegram chat.
///
/// The inline keyboard's callback data is the broker's `ag:<verb>:<id>`
/// token; whatever tails the bot's updates feeds that token back through
/// `/channel-callback` or the drop directory.
pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramChannel {
    /// Create a channel from its config section.
    #[must_use]
    pub fn new(config: &keyward_config::TelegramChannelConfig) -> Self {
        Self {
            bot: Bot::new(config.bot_token.clone()),
            chat_id: ChatId(config.chat_id),
        }
    }

    /// Render the prompt message body.
    fn prompt_text(prompt: &ApprovalPrompt) -> String {
        format!(
            "<b>Secret access requested</b>\n\n\
             <code>{}/{}</code> in vault <code>{}</code>\n\n\
             Reason: {}",
            html_escape(&prompt.item),
            html_escape(&prompt.field),
            html_escape(&prompt.vault),
            html_escape(&prompt.reason),
        )
    }
}

/// Escape text for safe inclusion in Telegram HTML.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Split a `chat_id:message_id` handle back into its parts.
fn parse_handle(handle: &MessageHandle) -> ChannelResult<(ChatId, MessageId)> {
    let (chat, message) = handle
        .message_ref
        .split_once(':')
        .ok_or_else(|| ChannelError::Update(format!("bad message ref '{}'", handle.message_ref)))?;
    let chat = chat
        .parse::<i64>()
        .map_err(|e| ChannelError::Update(format!("bad chat id in message ref: {e}")))?;
    let message = message
        .parse::<i32>()
        .map_err(|e| ChannelError::Update(format!("bad message id in message ref: {e}")))?;
    Ok((ChatId(chat), MessageId(message)))
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_prompt(&self, prompt: &ApprovalPrompt) -> ChannelResult<MessageHandle> {
        let approve = CallbackData::Approve(prompt.request_id).to_string();
        let deny = CallbackData::Deny(prompt.request_id).to_string();
        let keyboard = InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::callback("✅ Approve", approve),
            InlineKeyboardButton::callback("❌ Deny", deny),
        ]]);

        let message = self
            .bot
            .send_message(self.chat_id, Self::prompt_text(prompt))
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))?;

        debug!(request_id = %prompt.request_id, message_id = message.id.0, "approval prompt sent");
        Ok(MessageHandle {
            channel: self.name().to_owned(),
            message_ref: format!("{}:{}", self.chat_id.0, message.id.0),
        })
    }

    async fn update_outcome(
        &self,
        handle: &MessageHandle,
        approved: bool,
        prompt: &ApprovalPrompt,
    ) -> ChannelResult<()> {
        let (chat_id, message_id) = parse_handle(handle)?;

        // Retire the buttons so the prompt cannot be pressed twice.
        self.bot
            .edit_message_reply_markup(chat_id, message_id)
            .reply_markup(InlineKeyboardMarkup::new(
                Vec::<Vec<InlineKeyboardButton>>::new(),
            ))
            .await
            .map_err(|e| ChannelError::Update(e.to_string()))?;

        let verdict = if approved { "✅ Approved" } else { "❌ Denied" };
        self.bot
            .send_message(
                chat_id,
                format!(
                    "{verdict}: <code>{}/{}</code>",
                    html_escape(&prompt.item),
                    html_escape(&prompt.field),
                ),
            )
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| ChannelError::Update(e.to_string()))?;
        Ok(())
    }

    async fn validate(&self) -> ChannelResult<()> {
        self.bot
            .get_me()
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::Validation(format!("telegram bot unreachable: {e}")))
    }
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_core::RequestId;

    fn prompt() -> ApprovalPrompt {
        ApprovalPrompt {
            request_id: RequestId::new(),
            vault: "sec".to_owned(),
            item: "stripe".to_owned(),
            field: "key".to_owned(),
            reason: "check <webhooks>".to_owned(),
        }
    }

    #[test]
    fn test_prompt_text_escapes_html() {
        let text = TelegramChannel::prompt_text(&prompt());
        assert!(text.contains("check &lt;webhooks&gt;"));
        assert!(!text.contains("<webhooks>"));
    }

    #[test]
    fn test_parse_handle_roundtrip() {
        let handle = MessageHandle {
            channel: "telegram".to_owned(),
            message_ref: "-100123:42".to_owned(),
        };
        let (chat, message) = parse_handle(&handle).unwrap();
        assert_eq!(chat, ChatId(-100_123));
        assert_eq!(message, MessageId(42));
    }

    #[test]
    fn test_parse_handle_rejects_garbage() {
        let handle = MessageHandle {
            channel: "telegram".to_owned(),
            message_ref: "no-separator".to_owned(),
        };
        assert!(parse_handle(&handle).is_err());
    }
}
