//! Outbound notifications
//!
//! Best-effort fan-out after a successful provisioning: credentials email to
//! the customer plus a Telegram alert to the shop owner. Both channels are
//! dispatched on detached tasks and their failures are logged only; they
//! never change a persisted status or delay the response.

pub mod email;
pub mod telegram;

pub use email::{EmailSender, HttpMailer};
pub use telegram::{OwnerAlerter, TelegramNotifier};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::logging::mask_email;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Notification rejected: {message}")]
    Rejected { message: String },
}

/// Everything the channels need after one successful provisioning.
#[derive(Debug, Clone)]
pub struct PanelCreatedNotification {
    pub email: String,
    pub username: String,
    pub password: String,
    pub panel_user_id: u64,
    pub server_id: u64,
    pub plan_name: String,
    pub price: u64,
    pub panel_url: String,
    pub invoice_date: DateTime<Utc>,
}

/// Fan-out point for post-provisioning notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn EmailSender>,
    alerter: Arc<dyn OwnerAlerter>,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn EmailSender>, alerter: Arc<dyn OwnerAlerter>) -> Self {
        Self { mailer, alerter }
    }

    /// Dispatch both channels without awaiting them.
    pub fn dispatch_panel_created(&self, notification: PanelCreatedNotification) {
        let mailer = Arc::clone(&self.mailer);
        let mail = notification.clone();
        tokio::spawn(async move {
            match mailer.send_panel_details(&mail).await {
                Ok(()) => info!(recipient = %mask_email(&mail.email), "credentials email sent"),
                Err(e) => error!(
                    recipient = %mask_email(&mail.email),
                    error = %e,
                    "failed to send credentials email"
                ),
            }
        });

        let alerter = Arc::clone(&self.alerter);
        tokio::spawn(async move {
            match alerter.send_panel_alert(&notification).await {
                Ok(()) => info!(
                    panel_user_id = notification.panel_user_id,
                    "owner alert sent"
                ),
                Err(e) => error!(
                    panel_user_id = notification.panel_user_id,
                    error = %e,
                    "failed to send owner alert"
                ),
            }
        });
    }
}

/// No-op channels for tests and unconfigured deployments.
pub struct NullSink;

#[async_trait]
impl EmailSender for NullSink {
    async fn send_panel_details(
        &self,
        _notification: &PanelCreatedNotification,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[async_trait]
impl OwnerAlerter for NullSink {
    async fn send_panel_alert(
        &self,
        _notification: &PanelCreatedNotification,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Format an integer rupiah amount the way the storefront displays it.
pub fn format_rupiah(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("Rp{}", grouped)
}
