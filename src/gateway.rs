use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ReplyParameters};

use crate::error::GatewayError;

/// Narrow contract against the messaging platform. The router depends only
/// on this; tests substitute a recording double.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send `text` to `chat`, optionally threading it as a reply, and
    /// return the id of the sent message.
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, GatewayError>;
}

/// Telegram-backed gateway over a teloxide `Bot`.
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, GatewayError> {
        let mut request = self.bot.send_message(chat, text);

        if let Some(reply_to) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(reply_to));
        }

        let sent = request.await.map_err(|e| GatewayError {
            chat,
            reason: e.to_string(),
        })?;

        Ok(sent.id)
    }
}
