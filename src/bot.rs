use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::gateway::TelegramGateway;
use crate::router::{MessageEvent, ReplyRef, Router};

/// Run the Telegram dispatcher until the token is cancelled.
///
/// Shutdown is two-phase: cancellation stops update intake first, then the
/// dispatcher drains and releases its resources before this returns.
pub async fn run(config: Arc<Config>, shutdown: CancellationToken) -> Result<()> {
    let bot = Bot::new(&config.bot_token);
    let gateway = Arc::new(TelegramGateway::new(bot.clone()));
    let router = Arc::new(Router::new(config, gateway));

    info!("Starting Telegram bot...");

    let handler = Update::filter_message().endpoint(handle_message);

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("bot"))
        .build();

    let shutdown_token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        info!("Stop requested, shutting down dispatcher...");
        match shutdown_token.shutdown() {
            Ok(done) => done.await,
            Err(e) => warn!("Dispatcher was not running: {}", e),
        }
    });

    dispatcher.dispatch().await;

    info!("Dispatcher stopped");
    Ok(())
}

async fn handle_message(msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    // Photos, stickers, joins etc. match no routing rule by design.
    let Some(text) = msg.text() else {
        debug!(chat = msg.chat.id.0, "Ignoring non-text message");
        return Ok(());
    };

    let sender_name = msg
        .from
        .as_ref()
        .map(|user| user.full_name())
        .unwrap_or_else(|| "unknown".to_string());

    let event = MessageEvent {
        origin_chat: msg.chat.id,
        message_id: msg.id,
        sender_id: msg.from.as_ref().map(|user| user.id),
        sender_name,
        text: text.to_string(),
        reply: msg.reply_to_message().map(|quoted| ReplyRef {
            message_id: quoted.id,
            text: quoted.text().map(str::to_string),
        }),
    };

    // Per-event containment: a failed relay is logged (and, for unresolved
    // replies, already surfaced to the operator) but never aborts the loop.
    if let Err(e) = router.handle(&event).await {
        error!("Relay failed: {}", e);
    }

    Ok(())
}
