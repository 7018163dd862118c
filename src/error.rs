use teloxide::types::{ChatId, MessageId};
use thiserror::Error;

/// Outbound send failure reported by the messaging gateway.
///
/// No automatic retry: the caller logs it and moves on to the next event.
#[derive(Debug, Clone, Error)]
#[error("send to chat {chat} failed: {reason}")]
pub struct GatewayError {
    pub chat: ChatId,
    pub reason: String,
}

/// Per-event relay failure. Contained within the event that produced it;
/// never propagated into the dispatch loop.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A support-side reply whose original sender could not be recovered,
    /// neither from the reply map nor from the tag embedded in the
    /// forwarded copy.
    #[error("could not find the original sender for reply to message {}", reply_to.0)]
    UnresolvedOrigin { reply_to: MessageId },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
