//! Telegram Bot API notifier.
//!
//! Each recipient is a chat id; the message is sent to every chat with
//! one `sendMessage` call and the per-chat outcome collected into a
//! [`DeliveryReport`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::monitor::{
    error::{MonitorError, MonitorResult},
    provider::{DeliveryReport, FailedDelivery, Notifier},
};
use crate::services::is_transient_status;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramNotifier {
    api_url: String,
    bot_token: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

struct ChatFailure {
    error: String,
    transient: bool,
}

impl TelegramNotifier {
    pub fn new(api_url: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            http: Client::new(),
        }
    }

    async fn send_one(&self, chat_id: &str, text: &str) -> Result<(), ChatFailure> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let response = self
            .http
            .post(&url)
            .json(&SendMessage { chat_id, text, disable_web_page_preview: true })
            .send()
            .await
            // The request URL carries the bot token; keep it out of errors.
            .map_err(|err| ChatFailure { error: err.without_url().to_string(), transient: true })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let description = response.text().await.unwrap_or_default();
        Err(ChatFailure {
            error: format!("Telegram returned HTTP {}: {}", status, description.trim()),
            transient: is_transient_status(status),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipients: &[String], message: &str) -> MonitorResult<DeliveryReport> {
        let mut report = DeliveryReport::default();
        let mut any_transient = false;

        for chat_id in recipients {
            match self.send_one(chat_id, message).await {
                Ok(()) => report.delivered.push(chat_id.clone()),
                Err(failure) => {
                    tracing::warn!(chat_id = %chat_id, "Telegram delivery failed: {}", failure.error);
                    any_transient |= failure.transient;
                    report.failed.push(FailedDelivery {
                        recipient: chat_id.clone(),
                        error: failure.error,
                    });
                }
            }
        }

        if report.delivered.is_empty() && !report.failed.is_empty() {
            return Err(MonitorError::notify(
                format!(
                    "delivery failed for all {} recipients: {}",
                    report.failed.len(),
                    report.failed[0].error
                ),
                any_transient,
            ));
        }

        tracing::info!(
            "Alert sent: {}/{} successful deliveries",
            report.delivered.len(),
            recipients.len()
        );
        Ok(report)
    }

    fn notifier_name(&self) -> &str {
        "telegram"
    }
}
