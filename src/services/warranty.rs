//! Warranty claims
//!
//! A completed purchase can be replaced while the warranty window is open
//! and the replacement budget is unspent, but only when the original account
//! is actually gone from the panel. Claims verify the buyer's email and
//! re-provision through the same orchestrator as the payment path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::catalog::PlanCatalog;
use crate::config::WarrantyConfig;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError};
use crate::notify::{NotificationDispatcher, PanelCreatedNotification};
use crate::panel::PanelGateways;
use crate::services::provisioner::{ProvisionRequest, Provisioner};
use crate::store::{PanelDetails, Transaction, TransactionStore, TxStatus};

/// Remaining warranty budget for one transaction.
#[derive(Debug, Clone, Serialize)]
pub struct WarrantyStatus {
    pub remaining_days: i64,
    pub remaining_replace: i64,
    pub eligible: bool,
}

pub struct WarrantyService {
    store: Arc<dyn TransactionStore>,
    panels: PanelGateways,
    catalog: Arc<PlanCatalog>,
    provisioner: Arc<Provisioner>,
    dispatcher: NotificationDispatcher,
    config: WarrantyConfig,
}

impl WarrantyService {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        panels: PanelGateways,
        catalog: Arc<PlanCatalog>,
        provisioner: Arc<Provisioner>,
        dispatcher: NotificationDispatcher,
        config: WarrantyConfig,
    ) -> Self {
        Self {
            store,
            panels,
            catalog,
            provisioner,
            dispatcher,
            config,
        }
    }

    /// Remaining days and replacements for a transaction at `now`.
    pub fn evaluate(&self, transaction: &Transaction, now: DateTime<Utc>) -> WarrantyStatus {
        let days_since = (now - transaction.created_at).num_days();
        let remaining_days = self.config.days - days_since;
        let remaining_replace =
            i64::from(self.config.replace_limit) - i64::from(transaction.replace_used);

        WarrantyStatus {
            remaining_days,
            remaining_replace,
            eligible: remaining_days > 0 && remaining_replace > 0,
        }
    }

    /// Warranty view for one completed transaction.
    pub async fn status(&self, transaction_id: &str) -> AppResult<WarrantyStatus> {
        let transaction = self.load_completed(transaction_id).await?;
        Ok(self.evaluate(&transaction, Utc::now()))
    }

    /// Process a replacement claim.
    ///
    /// The still-active check consults the panel's user list; a panel error
    /// there refuses the claim rather than passing it (an unreachable panel
    /// must never look like a deleted account).
    pub async fn claim(&self, transaction_id: &str, email: &str) -> AppResult<PanelDetails> {
        let transaction = self.load_completed(transaction_id).await?;

        if !email.trim().eq_ignore_ascii_case(&transaction.email) {
            return Err(not_eligible("Email tidak sesuai dengan transaksi ini"));
        }

        let status = self.evaluate(&transaction, Utc::now());
        if status.remaining_days <= 0 {
            return Err(not_eligible("Masa garansi sudah berakhir"));
        }
        if status.remaining_replace <= 0 {
            return Err(not_eligible("Batas penggantian sudah tercapai"));
        }

        let plan = self
            .catalog
            .resolve(&transaction.plan_id, transaction.panel_kind, transaction.access)
            .ok_or_else(|| {
                AppError::new(AppErrorKind::Domain(DomainError::PlanNotFound {
                    plan_id: transaction.plan_id.clone(),
                }))
            })?;

        let users = self.panels.get(transaction.panel_kind).list_users().await?;
        let still_active = users.iter().any(|u| {
            u.username.eq_ignore_ascii_case(&transaction.username)
                || u.email.eq_ignore_ascii_case(&transaction.email)
        });
        if still_active {
            return Err(not_eligible(
                "Akun panel masih aktif. Garansi belum bisa digunakan",
            ));
        }

        let request = ProvisionRequest {
            username: transaction.username.clone(),
            email: transaction.email.clone(),
            panel_kind: transaction.panel_kind,
            memory_mb: plan.memory_mb,
            disk_mb: plan.disk_mb,
            cpu_percent: plan.cpu_percent,
        };
        let provisioned = self.provisioner.provision(&request).await.map_err(|_| {
            AppError::new(AppErrorKind::Domain(DomainError::ProvisionFailed {
                transaction_id: transaction_id.to_string(),
            }))
        })?;

        let replace_used = self
            .store
            .increment_replace_used(transaction_id)
            .await?
            .unwrap_or(transaction.replace_used + 1);

        info!(
            transaction_id = %transaction_id,
            replace_used = replace_used,
            server_id = provisioned.server_id,
            "warranty replacement provisioned"
        );

        self.dispatcher
            .dispatch_panel_created(PanelCreatedNotification {
                email: transaction.email.clone(),
                username: transaction.username.clone(),
                password: provisioned.password.clone(),
                panel_user_id: provisioned.user_id,
                server_id: provisioned.server_id,
                plan_name: plan.name.to_string(),
                price: plan.price,
                panel_url: provisioned.panel_url.clone(),
                invoice_date: transaction.created_at,
            });

        Ok(PanelDetails {
            username: transaction.username,
            password: provisioned.password,
            server_id: provisioned.server_id,
            panel_url: provisioned.panel_url,
        })
    }

    async fn load_completed(&self, transaction_id: &str) -> AppResult<Transaction> {
        let transaction = self
            .store
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found(transaction_id))?;

        if transaction.status != TxStatus::Completed {
            return Err(not_eligible(
                "Selesaikan pembayaran terlebih dahulu sebelum klaim garansi",
            ));
        }

        Ok(transaction)
    }
}

fn not_eligible(reason: &str) -> AppError {
    AppError::new(AppErrorKind::Domain(DomainError::WarrantyNotEligible {
        reason: reason.to_string(),
    }))
}
