//! Telegram Bot API sink

use std::time::Duration;

use serde::Serialize;

use super::NotificationSink;
use crate::config::TelegramChannel;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Posts `sendMessage` calls for one bot/chat pair
///
/// Each message is sent on its own spawned task; failures are logged and
/// dropped.
#[derive(Clone)]
pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(api_base: &str, channel: &TelegramChannel) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                channel.bot_token
            ),
            chat_id: channel.chat_id.clone(),
        })
    }

    async fn post(&self, text: &str) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl NotificationSink for TelegramSink {
    fn send(&self, message: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(chat_id = %self.chat_id, "No runtime available, notification dropped");
            return;
        };

        let sink = self.clone();
        handle.spawn(async move {
            if let Err(e) = sink.post(&message).await {
                tracing::warn!(chat_id = %sink.chat_id, error = %e, "Telegram notification failed");
            }
        });
    }
}
