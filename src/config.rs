use anyhow::{Context, Result};
use teloxide::types::ChatId;

const DEFAULT_PORT: u16 = 5000;

/// Process-wide routing configuration. Loaded once at startup from the
/// environment, read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot credential token from BotFather.
    pub bot_token: String,
    /// Group chat where user messages are relayed for human operators.
    pub support_chat_id: ChatId,
    /// Secondary operator chat, treated like the support chat for replies.
    pub personal_chat_id: ChatId,
    /// Port for the hosting platform's health-check listener.
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = lookup("TELEGRAM_TOKEN")
            .filter(|t| !t.is_empty())
            .context("TELEGRAM_TOKEN is not set")?;

        let support_chat_id = require_chat_id(&lookup, "TELEGRAM_SUPPORT_CHAT_ID")?;
        let personal_chat_id = require_chat_id(&lookup, "PERSONAL_ACCOUNT_CHAT_ID")?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            bot_token,
            support_chat_id,
            personal_chat_id,
            port,
        })
    }

    /// True for the support chat and the personal account chat, the two
    /// chats whose replies route back to users.
    pub fn is_operator_chat(&self, chat: ChatId) -> bool {
        chat == self.support_chat_id || chat == self.personal_chat_id
    }
}

fn require_chat_id(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<ChatId> {
    let raw = lookup(key).with_context(|| format!("{key} is not set"))?;
    let id = raw
        .parse::<i64>()
        .with_context(|| format!("{key} must be a numeric chat id, got {raw:?}"))?;
    Ok(ChatId(id))
}
