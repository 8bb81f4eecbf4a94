//! Payment status reconciliation
//!
//! Poll-driven state machine per transaction: pending → paid →
//! completed/failed. Completed and failed short-circuit without touching the
//! gateway, and a per-transaction advisory lock guarantees at most one
//! provisioning attempt even when polls race.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info};

use crate::catalog::PlanCatalog;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError};
use crate::notify::{NotificationDispatcher, PanelCreatedNotification};
use crate::payments::{GatewayPaymentStatus, QrisGateway};
use crate::services::provisioner::{ProvisionRequest, Provisioner};
use crate::store::{PanelDetails, Transaction, TransactionStore, TxStatus};

/// Result of one reconcile pass, shaped for the QR payment page.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_details: Option<PanelDetails>,
    /// Set exactly once, on the poll that completed the transaction; the UI
    /// uses it for the one-time community-group prompt.
    pub prompt_community_join: bool,
}

impl ReconcileOutcome {
    fn plain(status: TxStatus) -> Self {
        Self {
            status,
            panel_details: None,
            prompt_community_join: false,
        }
    }
}

/// Per-transaction advisory locks, keyed by transaction id.
///
/// Entries are a few bytes each and never pruned.
#[derive(Default)]
struct TxLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TxLocks {
    async fn acquire(&self, transaction_id: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().await;
            map.entry(transaction_id.to_string())
                .or_default()
                .clone()
        };
        entry.lock_owned().await
    }
}

pub struct PaymentReconciler {
    store: Arc<dyn TransactionStore>,
    gateway: Arc<QrisGateway>,
    catalog: Arc<PlanCatalog>,
    provisioner: Arc<Provisioner>,
    dispatcher: NotificationDispatcher,
    locks: TxLocks,
}

impl PaymentReconciler {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        gateway: Arc<QrisGateway>,
        catalog: Arc<PlanCatalog>,
        provisioner: Arc<Provisioner>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            gateway,
            catalog,
            provisioner,
            dispatcher,
            locks: TxLocks::default(),
        }
    }

    /// Reconcile one transaction against the gateway.
    ///
    /// Idempotent: terminal transactions return their cached outcome without
    /// a gateway call, and the advisory lock makes racing polls serialize so
    /// provisioning runs at most once.
    pub async fn reconcile(&self, transaction_id: &str) -> AppResult<ReconcileOutcome> {
        let _guard = self.locks.acquire(transaction_id).await;

        let transaction = self
            .store
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found(transaction_id))?;

        match transaction.status {
            TxStatus::Completed => {
                return Ok(ReconcileOutcome {
                    status: TxStatus::Completed,
                    panel_details: transaction.panel_details,
                    prompt_community_join: false,
                });
            }
            // Terminal, same short-circuit as completed: a failed transaction
            // must not heal back into pending handling on a later poll.
            TxStatus::Failed => return Ok(ReconcileOutcome::plain(TxStatus::Failed)),
            TxStatus::Pending if transaction.is_expired(chrono::Utc::now()) => {
                return Err(AppError::new(AppErrorKind::Domain(
                    DomainError::PaymentExpired {
                        transaction_id: transaction_id.to_string(),
                    },
                )));
            }
            TxStatus::Pending | TxStatus::Paid => {}
        }

        let gateway_status = self
            .gateway
            .poll_status(&transaction.provider_transaction_id)
            .await?;

        match gateway_status {
            // Unknown wording already logged by the gateway; fail-safe to
            // pending rather than risking a false terminal transition.
            GatewayPaymentStatus::Pending | GatewayPaymentStatus::Unknown(_) => {
                Ok(ReconcileOutcome::plain(transaction.status))
            }
            GatewayPaymentStatus::Failed => {
                self.store
                    .update_status(transaction_id, TxStatus::Failed, None)
                    .await?;
                info!(transaction_id = %transaction_id, "payment reported failed by gateway");
                Ok(ReconcileOutcome::plain(TxStatus::Failed))
            }
            GatewayPaymentStatus::Succeeded => self.complete(&transaction).await,
        }
    }

    /// The paid → completed edge: persist `paid`, provision, persist the
    /// outcome. Runs under the per-transaction lock.
    async fn complete(&self, transaction: &Transaction) -> AppResult<ReconcileOutcome> {
        let transaction_id = transaction.transaction_id.as_str();

        if transaction.status == TxStatus::Pending {
            self.store
                .update_status(transaction_id, TxStatus::Paid, None)
                .await?;
        }

        let plan = self
            .catalog
            .resolve(&transaction.plan_id, transaction.panel_kind, transaction.access)
            .ok_or_else(|| {
                AppError::new(AppErrorKind::Domain(DomainError::PlanNotFound {
                    plan_id: transaction.plan_id.clone(),
                }))
            })?;

        let request = ProvisionRequest {
            username: transaction.username.clone(),
            email: transaction.email.clone(),
            panel_kind: transaction.panel_kind,
            memory_mb: plan.memory_mb,
            disk_mb: plan.disk_mb,
            cpu_percent: plan.cpu_percent,
        };

        let provisioned = match self.provisioner.provision(&request).await {
            Ok(provisioned) => provisioned,
            Err(e) => {
                error!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "provisioning failed, marking transaction failed"
                );
                self.store
                    .update_status(transaction_id, TxStatus::Failed, None)
                    .await?;
                return Err(AppError::new(AppErrorKind::Domain(
                    DomainError::ProvisionFailed {
                        transaction_id: transaction_id.to_string(),
                    },
                )));
            }
        };

        let details = PanelDetails {
            username: transaction.username.clone(),
            password: provisioned.password.clone(),
            server_id: provisioned.server_id,
            panel_url: provisioned.panel_url.clone(),
        };
        self.store
            .update_status(transaction_id, TxStatus::Completed, Some(&details))
            .await?;

        info!(
            transaction_id = %transaction_id,
            server_id = provisioned.server_id,
            "transaction completed"
        );

        self.dispatcher
            .dispatch_panel_created(PanelCreatedNotification {
                email: transaction.email.clone(),
                username: transaction.username.clone(),
                password: provisioned.password,
                panel_user_id: provisioned.user_id,
                server_id: provisioned.server_id,
                plan_name: plan.name.to_string(),
                price: plan.price,
                panel_url: provisioned.panel_url,
                invoice_date: transaction.created_at,
            });

        Ok(ReconcileOutcome {
            status: TxStatus::Completed,
            panel_details: Some(details),
            prompt_community_join: true,
        })
    }
}
