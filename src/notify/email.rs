use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use crate::config::{MailConfig, NotifyConfig};
use crate::notify::{NotifyError, PanelCreatedNotification};

/// Delivery channel for the panel credentials email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_panel_details(
        &self,
        notification: &PanelCreatedNotification,
    ) -> Result<(), NotifyError>;
}

/// Sends credentials through an HTTP mail relay (JSON POST).
pub struct HttpMailer {
    http: Client,
    config: MailConfig,
    shop_name: String,
    community_group_link: String,
}

impl HttpMailer {
    pub fn new(notify: &NotifyConfig) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            config: notify.mail.clone(),
            shop_name: notify.shop_name.clone(),
            community_group_link: notify.community_group_link.clone(),
        })
    }

    fn render_body(&self, n: &PanelCreatedNotification) -> String {
        format!(
            "<p>Halo,</p>\
             <p>Terima kasih telah membeli panel Pterodactyl di {shop}. \
             Berikut adalah detail akun panel Anda:</p>\
             <ul>\
               <li><strong>Paket:</strong> {plan}</li>\
               <li><strong>Username:</strong> {username}</li>\
               <li><strong>Password:</strong> <code>{password}</code></li>\
               <li><strong>Server ID:</strong> {server_id}</li>\
               <li><strong>URL Panel:</strong> <a href=\"{url}\">{url}</a></li>\
             </ul>\
             <p>Silakan login ke panel dengan kredensial di atas.</p>\
             <p>Gabung grup komunitas kami: <a href=\"{group}\">{group}</a></p>\
             <p>Salam,<br>Tim {shop}</p>",
            shop = self.shop_name,
            plan = n.plan_name,
            username = n.username,
            password = n.password,
            server_id = n.server_id,
            url = n.panel_url,
            group = self.community_group_link,
        )
    }
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send_panel_details(
        &self,
        notification: &PanelCreatedNotification,
    ) -> Result<(), NotifyError> {
        if self.config.endpoint.is_empty() {
            warn!("mail relay not configured, skipping credentials email");
            return Ok(());
        }

        let payload = json!({
            "from": self.config.from,
            "to": notification.email,
            "subject": format!("Detail Akun Panel Pterodactyl {}", self.shop_name),
            "html": self.render_body(notification),
        });

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network {
                message: format!("mail relay request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                message: format!("mail relay returned HTTP {}: {}", status, body),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramConfig;
    use chrono::Utc;

    fn mailer() -> HttpMailer {
        HttpMailer::new(&NotifyConfig {
            shop_name: "My Panel Shop".to_string(),
            community_group_link: "https://chat.example/group".to_string(),
            mail: MailConfig {
                endpoint: "https://mail.example/send".to_string(),
                api_key: "key".to_string(),
                from: "Panel <no-reply@example.com>".to_string(),
            },
            telegram: TelegramConfig {
                bot_token: String::new(),
                owner_chat_id: String::new(),
            },
        })
        .expect("mailer init should succeed")
    }

    #[test]
    fn body_contains_credentials_and_panel_link() {
        let body = mailer().render_body(&PanelCreatedNotification {
            email: "budi@example.com".to_string(),
            username: "budi".to_string(),
            password: "s3cretpass".to_string(),
            panel_user_id: 7,
            server_id: 42,
            plan_name: "1GB / Unlimited".to_string(),
            price: 15000,
            panel_url: "https://panel.example.com".to_string(),
            invoice_date: Utc::now(),
        });

        assert!(body.contains("s3cretpass"));
        assert!(body.contains("Server ID:</strong> 42"));
        assert!(body.contains("https://panel.example.com"));
        assert!(body.contains("My Panel Shop"));
    }
}
