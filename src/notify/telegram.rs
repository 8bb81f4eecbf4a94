use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use crate::config::TelegramConfig;
use crate::logging::mask_email;
use crate::notify::{format_rupiah, NotifyError, PanelCreatedNotification};

/// Internal owner-alert channel.
#[async_trait]
pub trait OwnerAlerter: Send + Sync {
    async fn send_panel_alert(
        &self,
        notification: &PanelCreatedNotification,
    ) -> Result<(), NotifyError>;
}

/// Posts a Markdown alert to the owner's Telegram chat.
pub struct TelegramNotifier {
    http: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self { http, config })
    }

    fn render_message(notification: &PanelCreatedNotification) -> String {
        format!(
            "🔔 *New Panel Created*\n\n\
             👤 User ID: `{}`\n\
             📅 Invoice Date: {}\n\
             💰 Price: {}\n\
             📦 Plan: {}\n\
             📧 Email: {}",
            notification.panel_user_id,
            notification.invoice_date.format("%d %B %Y %H:%M"),
            format_rupiah(notification.price),
            notification.plan_name,
            mask_email(&notification.email),
        )
    }
}

#[async_trait]
impl OwnerAlerter for TelegramNotifier {
    async fn send_panel_alert(
        &self,
        notification: &PanelCreatedNotification,
    ) -> Result<(), NotifyError> {
        if self.config.bot_token.is_empty() || self.config.owner_chat_id.is_empty() {
            warn!("telegram bot not configured, skipping owner alert");
            return Ok(());
        }

        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );
        let payload = json!({
            "chat_id": self.config.owner_chat_id,
            "text": Self::render_message(notification),
            "parse_mode": "Markdown",
        });

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network {
                message: format!("telegram request failed: {}", e),
            })?;

        let body: serde_json::Value =
            response.json().await.map_err(|e| NotifyError::Network {
                message: format!("telegram returned non-JSON: {}", e),
            })?;

        if !body.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            let description = body
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(NotifyError::Rejected {
                message: format!("telegram API error: {}", description),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn alert_masks_email_and_formats_price() {
        let message = TelegramNotifier::render_message(&PanelCreatedNotification {
            email: "budisantoso@gmail.com".to_string(),
            username: "budi".to_string(),
            password: "pw".to_string(),
            panel_user_id: 7,
            server_id: 42,
            plan_name: "1GB / Unlimited".to_string(),
            price: 15000,
            panel_url: "https://panel.example.com".to_string(),
            invoice_date: Utc::now(),
        });

        assert!(message.contains("`7`"));
        assert!(message.contains("Rp15.000"));
        assert!(message.contains("budisa***@gmail.com"));
        assert!(!message.contains("budisantoso@gmail.com"));
    }
}
