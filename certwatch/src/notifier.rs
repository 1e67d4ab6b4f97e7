use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::errors::{CertWatchError, CertWatchResult};
use crate::http_utils::handle_api_response;

/// Whole days, hours and minutes left until expiration (floored)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub expired: bool,
}

impl Countdown {
    pub fn between(now: DateTime<Tz>, expiration: DateTime<Tz>) -> Self {
        let total_seconds = (expiration - now).num_seconds();
        let remaining = total_seconds.abs();
        Self {
            days: remaining / 86_400,
            hours: remaining % 86_400 / 3_600,
            minutes: remaining % 3_600 / 60,
            expired: total_seconds < 0,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d {}h {}m", self.days, self.hours, self.minutes)
    }
}

/// Chat summary for one app
pub fn format_message(app_name: &str, expiration: DateTime<Tz>, now: DateTime<Tz>) -> String {
    let countdown = Countdown::between(now, expiration);
    let remaining = if countdown.expired {
        format!("Expired: {} ago", countdown)
    } else {
        format!("Expires in: {}", countdown)
    };

    format!(
        "{}\nExpiration Date: {}\n{}",
        app_name,
        expiration.format("%a %d %b at %H:%M %Z"),
        remaining
    )
}

/// Chat capability: post one message
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(&self, text: &str) -> CertWatchResult<()>;
}

#[derive(Debug, Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'a str,
}

/// Telegram Bot API `sendMessage` client
pub struct TelegramClient {
    http_client: reqwest::Client,
    api_base: String,
    api_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(
        http_client: reqwest::Client,
        api_base: &str,
        api_token: String,
        chat_id: String,
    ) -> Self {
        Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_token,
            chat_id,
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.api_token)
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_message(&self, text: &str) -> CertWatchResult<()> {
        let body = TelegramMessage {
            chat_id: &self.chat_id,
            text: format!("```---{}```", text),
            parse_mode: "Markdown",
        };

        let response = self
            .http_client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| CertWatchError::Notify {
                message: format!("Telegram request failed: {}", e),
            })?;

        handle_api_response("Telegram", response)
            .await
            .map_err(|e| CertWatchError::Notify {
                message: e.to_string(),
            })?;
        debug!("Telegram message delivered");
        Ok(())
    }
}

/// Prints and sends the expiration summary; delivery is best-effort
pub struct Notifier {
    chat: Option<Arc<dyn ChatApi>>,
    timezone: Tz,
}

impl Notifier {
    pub fn new(chat: Option<Arc<dyn ChatApi>>, timezone: Tz) -> Self {
        Self { chat, timezone }
    }

    pub async fn notify(&self, app_name: &str, expiration: DateTime<Tz>) {
        let now = Utc::now().with_timezone(&self.timezone);
        self.notify_at(app_name, expiration, now).await;
    }

    pub async fn notify_at(&self, app_name: &str, expiration: DateTime<Tz>, now: DateTime<Tz>) {
        let message = format_message(app_name, expiration, now);
        println!("{}\n", message);

        let Some(chat) = &self.chat else {
            debug!("No chat configured, message only printed");
            return;
        };

        if let Err(e) = chat.send_message(&message).await {
            error!("Failed to send notification for {}: {}", app_name, e);
        }
    }
}
