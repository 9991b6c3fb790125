use std::time::Duration;

use async_trait::async_trait;
use teloxide::payloads::SendMessage;
use teloxide::prelude::*;
use teloxide::requests::JsonRequest;
use tracing::{debug, info};

use common::{AlertSink, Config};

/// Upper bound on a single `sendMessage` round trip.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(6);

/// Pushes alert lines to one Telegram chat.
///
/// Each message is sent from its own task, so a slow or unreachable Bot API
/// never stalls the scan loop. Failures are logged at debug level and dropped.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: i64) -> Self {
        Self { bot: Bot::new(token), chat_id: ChatId(chat_id) }
    }

    /// Build a notifier when both the bot token and the chat id are set.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        match (&cfg.telegram_token, cfg.telegram_chat_id) {
            (Some(token), Some(chat_id)) => {
                info!(target: "boot", chat_id, "Telegram delivery enabled");
                Some(Self::new(token.clone(), chat_id))
            }
            _ => None,
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id.0
    }

    /// Plain-text message with link previews off.
    fn request(&self, text: String) -> JsonRequest<SendMessage> {
        self.bot
            .send_message(self.chat_id, text)
            .disable_web_page_preview(true)
    }
}

#[async_trait]
impl AlertSink for TelegramNotifier {
    async fn deliver(&self, message: &str) {
        let chat_id = self.chat_id;
        let request = self.request(message.to_string());

        tokio::spawn(async move {
            match tokio::time::timeout(SEND_TIMEOUT, request.send()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => debug!(chat_id = ?chat_id, error = %e, "Telegram send failed"),
                Err(_) => debug!(chat_id = ?chat_id, "Telegram send timed out"),
            }
        });
    }
}
