//! Telegram transport: the thinnest possible shim between the bot API and
//! the channel traits. No policy lives here; every decision comes from the
//! inbound handler.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    teloxide::{Bot, prelude::*, types::ChatId},
    tracing::debug,
};

use {
    waypost_channels::{Inbound, Outbound},
    waypost_common::PrincipalId,
};

/// Build a bot client from a token.
pub fn bot(token: &str) -> Bot {
    Bot::new(token)
}

/// Outbound deliveries through the bot API.
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send_text(&self, to: PrincipalId, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(to), text).await?;
        Ok(())
    }
}

/// Run the long-polling update loop until the surrounding task is aborted.
///
/// Each text message is handed to the inbound handler; its replies go back
/// to the originating chat in order. Messages from other bots are ignored.
pub async fn run_transport(bot: Bot, handler: Arc<dyn Inbound>) -> Result<()> {
    debug!("telegram transport polling");
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let handler = Arc::clone(&handler);
        async move {
            if msg.from.as_ref().is_some_and(|user| user.is_bot) {
                return Ok(());
            }
            let Some(text) = msg.text() else {
                return Ok(());
            };
            let from: PrincipalId = msg.chat.id.0;
            for reply in handler.handle(from, text).await {
                bot.send_message(msg.chat.id, reply).await?;
            }
            Ok(())
        }
    })
    .await;
    Ok(())
}
