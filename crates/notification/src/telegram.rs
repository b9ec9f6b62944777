// In crates/notification/src/telegram.rs

use crate::{Error, Notifier, Result};
use app_config::NotificationSettings;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

/// Delivers alerts through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    /// The persistent HTTP client, built with the request timeout.
    http_client: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(settings: &NotificationSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;

        Ok(Self {
            http_client,
            bot_token: settings.bot_token.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    /// Posts the message to `POST /bot{token}/sendMessage`.
    async fn send(&self, destination: &str, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);

        let response = self
            .http_client
            .post(&url)
            .json(&json!({ "chat_id": destination, "text": message }))
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.without_url()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::RequestFailed(e.without_url()))?;
        interpret_response(status, &text)
    }
}

/// Telegram answers `{"ok": true, ...}` or `{"ok": false, "error_code": .., "description": ..}`.
pub fn interpret_response(status: u16, body: &str) -> Result<()> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !(200..300).contains(&status) => return Err(Error::HttpStatus(status)),
        Err(e) => return Err(Error::DeserializationFailed(e)),
    };

    if value.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }

    let code = value
        .get("error_code")
        .and_then(Value::as_i64)
        .unwrap_or(i64::from(status));
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    Err(Error::Rejected { code, description })
}
