//! Provisioning orchestrator
//!
//! Drives the user-creation → server-creation sequence against one panel
//! backend and rolls the user back when server creation fails. Never touches
//! the transaction store; persisting the outcome is the caller's job, which
//! keeps this safe to call from both the reconciler and the warranty flow.

use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{error, info, warn};

use crate::panel::{PanelGateways, PanelKind, PanelResult};

const PASSWORD_LEN: usize = 10;

/// Inputs for one provisioning attempt.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub username: String,
    pub email: String,
    pub panel_kind: PanelKind,
    pub memory_mb: u32,
    pub disk_mb: u32,
    pub cpu_percent: u32,
}

/// A fully provisioned panel account.
#[derive(Debug, Clone)]
pub struct ProvisionedPanel {
    pub user_id: u64,
    pub server_id: u64,
    pub password: String,
    pub panel_url: String,
}

pub struct Provisioner {
    panels: PanelGateways,
}

impl Provisioner {
    pub fn new(panels: PanelGateways) -> Self {
        Self { panels }
    }

    /// Create user and server on the requested backend.
    ///
    /// If server creation fails after the user was created, the user is
    /// deleted best-effort; a rollback failure is logged and the original
    /// error is still what's returned.
    pub async fn provision(&self, request: &ProvisionRequest) -> PanelResult<ProvisionedPanel> {
        let client = self.panels.get(request.panel_kind);
        let password = generate_password(PASSWORD_LEN);

        let user_id = client
            .create_user(&request.username, &request.email, &password)
            .await?;

        let server_name = format!("{}'s Server", request.username);
        let server_id = match client
            .add_server(
                user_id,
                &server_name,
                request.memory_mb,
                request.disk_mb,
                request.cpu_percent,
            )
            .await
        {
            Ok(server_id) => server_id,
            Err(e) => {
                warn!(
                    user_id = user_id,
                    panel = %request.panel_kind,
                    error = %e,
                    "server creation failed, rolling back user"
                );
                if let Err(rollback) = client.delete_user(user_id).await {
                    error!(
                        user_id = user_id,
                        panel = %request.panel_kind,
                        error = %rollback,
                        "rollback failed, orphaned panel user left behind"
                    );
                }
                return Err(e);
            }
        };

        info!(
            user_id = user_id,
            server_id = server_id,
            panel = %request.panel_kind,
            "panel account provisioned"
        );

        Ok(ProvisionedPanel {
            user_id,
            server_id,
            password,
            panel_url: client.panel_url().to_string(),
        })
    }
}

/// Alphanumeric password from the thread-local CSPRNG.
fn generate_password(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_have_fixed_length_and_charset() {
        let password = generate_password(PASSWORD_LEN);
        assert_eq!(password.len(), PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn passwords_are_not_repeated() {
        let a = generate_password(PASSWORD_LEN);
        let b = generate_password(PASSWORD_LEN);
        assert_ne!(a, b);
    }
}
