//! Telegram Bot API `sendMessage` dispatch.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::notifier::{Alert, Notifier};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

// Every Bot API method answers `{ ok, result?, description? }`.
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: Client,
    /// `{api_base}/bot{token}`.
    base_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(http: Client, api_base: &str, bot_token: &str, chat_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
            chat_id: chat_id.into(),
        }
    }

    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        let url = format!("{}/sendMessage", self.base_url);
        let text = alert.text();
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "Markdown",
        };

        debug!("Sending alert for message {}", alert.message_id);
        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        let body: TelegramResponse = response.json().await?;

        if !body.ok {
            let description = body
                .description
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(NotifyError::Api(description));
        }

        info!("Telegram alert with link sent for message {}", alert.message_id);
        Ok(())
    }
}
