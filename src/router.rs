use std::sync::Arc;

use teloxide::types::{ChatId, MessageId, UserId};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::RelayError;
use crate::gateway::Gateway;
use crate::replies::{Origin, ReplyMap};

const GREETING: &str = "Hello! This is the support bot.\n\n\
     Write your message here and a member of our support team \
     will get back to you as soon as possible.";

const UNRESOLVED_NOTICE: &str =
    "Could not find the original sender for this reply. The message was not delivered.";

/// One inbound message, as seen by the router. Immutable; handled once and
/// discarded.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub origin_chat: ChatId,
    pub message_id: MessageId,
    pub sender_id: Option<UserId>,
    pub sender_name: String,
    pub text: String,
    pub reply: Option<ReplyRef>,
}

/// The message this event replies to, if any.
#[derive(Debug, Clone)]
pub struct ReplyRef {
    pub message_id: MessageId,
    pub text: Option<String>,
}

/// Outcome of classification. First match wins; every event lands in
/// exactly one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// "/start" greeting, answered in place.
    Start,
    /// Operator reply, routed back to the originating user.
    ToUser,
    /// Plain user message, forwarded into the support chat.
    ToSupport,
    /// Deliberate no-op.
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A command other than /start; no handler is registered for those.
    UnknownCommand,
    /// A message in the support or personal chat that replies to nothing.
    OperatorChatNotReply,
}

/// Pure classification of an inbound event against the routing config.
pub fn classify(event: &MessageEvent, config: &Config) -> Route {
    if event.text.starts_with('/') {
        if is_start_command(&event.text) {
            Route::Start
        } else {
            Route::Ignored(IgnoreReason::UnknownCommand)
        }
    } else if config.is_operator_chat(event.origin_chat) {
        if event.reply.is_some() {
            Route::ToUser
        } else {
            Route::Ignored(IgnoreReason::OperatorChatNotReply)
        }
    } else {
        Route::ToSupport
    }
}

/// Classifies each inbound event and performs at most one outbound send.
/// Holds no mutable state besides the bounded reply map.
pub struct Router {
    config: Arc<Config>,
    gateway: Arc<dyn Gateway>,
    replies: ReplyMap,
}

impl Router {
    pub fn new(config: Arc<Config>, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            config,
            gateway,
            replies: ReplyMap::default(),
        }
    }

    /// Handle one event end to end. Errors are per-event: the caller logs
    /// them and carries on with the next update.
    pub async fn handle(&self, event: &MessageEvent) -> Result<(), RelayError> {
        let result = match classify(event, &self.config) {
            Route::Start => self.handle_start(event).await,
            Route::ToUser => self.forward_to_user(event).await,
            Route::ToSupport => self.forward_to_group(event).await,
            Route::Ignored(reason) => {
                debug!(chat = event.origin_chat.0, ?reason, "Ignoring message");
                Ok(())
            }
        };

        // Unresolved replies are surfaced to the operator in place, not
        // silently dropped.
        if let Err(RelayError::UnresolvedOrigin { .. }) = &result {
            if let Err(e) = self
                .gateway
                .send_message(event.origin_chat, UNRESOLVED_NOTICE, Some(event.message_id))
                .await
            {
                warn!("Failed to notify operator: {}", e);
            }
        }

        result
    }

    /// Static greeting, sent back to whichever chat issued /start.
    async fn handle_start(&self, event: &MessageEvent) -> Result<(), RelayError> {
        self.gateway
            .send_message(event.origin_chat, GREETING, None)
            .await?;
        Ok(())
    }

    /// Forward a user message into the support chat, tagged with the
    /// sender's identity, and remember where the copy came from.
    async fn forward_to_group(&self, event: &MessageEvent) -> Result<(), RelayError> {
        let tagged = format!(
            "{} [id:{}]:\n{}",
            event.sender_name, event.origin_chat.0, event.text
        );

        let forwarded = self
            .gateway
            .send_message(self.config.support_chat_id, &tagged, None)
            .await?;

        self.replies
            .record(
                forwarded,
                Origin {
                    chat: event.origin_chat,
                    message_id: event.message_id,
                },
            )
            .await;

        info!(
            user = ?event.sender_id,
            chat = event.origin_chat.0,
            forwarded = forwarded.0,
            "Forwarded message to support chat"
        );
        Ok(())
    }

    /// Route an operator reply back to the user who sent the quoted
    /// forwarded message.
    async fn forward_to_user(&self, event: &MessageEvent) -> Result<(), RelayError> {
        let Some(reply) = event.reply.as_ref() else {
            // Classification only routes replies here.
            return Err(RelayError::UnresolvedOrigin {
                reply_to: event.message_id,
            });
        };

        // The explicit map is authoritative; the tag embedded in the
        // forwarded copy covers entries lost to eviction or a restart,
        // at the cost of losing reply threading on the user side.
        let (origin_chat, thread_on) = match self.replies.resolve(reply.message_id).await {
            Some(origin) => (origin.chat, Some(origin.message_id)),
            None => {
                let chat = reply
                    .text
                    .as_deref()
                    .and_then(parse_origin_tag)
                    .ok_or(RelayError::UnresolvedOrigin {
                        reply_to: reply.message_id,
                    })?;
                (chat, None)
            }
        };

        self.gateway
            .send_message(origin_chat, &event.text, thread_on)
            .await?;

        info!(
            chat = origin_chat.0,
            reply_to = reply.message_id.0,
            "Routed support reply back to user"
        );
        Ok(())
    }
}

/// Matches "/start" plus the "/start@BotName" form Telegram uses in groups.
fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or(text);
    let command = command.split('@').next().unwrap_or(command);
    command == "/start"
}

/// Recover the origin chat id from the "[id:…]" tag on the first line of a
/// forwarded copy.
fn parse_origin_tag(text: &str) -> Option<ChatId> {
    let first_line = text.lines().next()?;
    let start = first_line.find("[id:")? + 4;
    let rest = &first_line[start..];
    let end = rest.find(']')?;
    rest[..end].parse::<i64>().ok().map(ChatId)
}
