//! Checkout flow
//!
//! Resolves the plan, computes the surcharge, creates the QRIS intent, and
//! persists the pending transaction. Also backs the invoice and history
//! views.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::catalog::{AccessTier, PlanCatalog};
use crate::config::FeeConfig;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError};
use crate::logging::mask_email;
use crate::panel::PanelKind;
use crate::payments::{LineItem, QrisGateway};
use crate::store::{StoreStats, Transaction, TransactionStore, TxStatus};

/// One checkout request from the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    pub plan_id: String,
    pub username: String,
    pub email: String,
    pub panel_kind: PanelKind,
    pub access: AccessTier,
}

/// What the QR payment page needs.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub transaction_id: String,
    pub amount: u64,
    pub fee: u64,
    pub total: u64,
    pub qr_image_url: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// One row of the public transaction history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub transaction_id: String,
    pub email: String,
    pub plan_id: String,
    pub plan_name: String,
    pub total: u64,
    pub status: TxStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

const HISTORY_LIMIT: usize = 50;

pub struct CheckoutService {
    store: Arc<dyn TransactionStore>,
    gateway: Arc<QrisGateway>,
    catalog: Arc<PlanCatalog>,
    fees: FeeConfig,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        gateway: Arc<QrisGateway>,
        catalog: Arc<PlanCatalog>,
        fees: FeeConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            catalog,
            fees,
        }
    }

    /// Create a payment intent and the matching pending transaction.
    pub async fn create_order(&self, request: CreateOrder) -> AppResult<CreatedOrder> {
        if request.username.trim().is_empty() {
            return Err(AppError::validation("username", "must not be empty"));
        }
        if request.email.trim().is_empty() || !request.email.contains('@') {
            return Err(AppError::validation("email", "must be a valid address"));
        }

        let plan = self
            .catalog
            .resolve(&request.plan_id, request.panel_kind, request.access)
            .ok_or_else(|| {
                AppError::new(AppErrorKind::Domain(DomainError::PlanNotFound {
                    plan_id: request.plan_id.clone(),
                }))
            })?;

        let fee = compute_fee(plan.price, &self.fees);
        let total = plan.price + fee;
        let transaction_id = generate_transaction_id();

        let items = [LineItem {
            name: plan.name.to_string(),
            qty: 1,
            price: plan.price,
        }];
        let intent = self
            .gateway
            .create_intent(
                &transaction_id,
                &request.username,
                &request.email,
                total,
                &items,
            )
            .await?;

        let transaction = Transaction {
            transaction_id: transaction_id.clone(),
            provider_transaction_id: intent.provider_transaction_id,
            username: request.username,
            email: request.email,
            plan_id: plan.id.to_string(),
            amount: plan.price,
            fee,
            total,
            qr_image_url: intent.qr_image_url.clone(),
            expires_at: intent.expires_at,
            panel_kind: request.panel_kind,
            access: request.access,
            status: TxStatus::Pending,
            created_at: Utc::now(),
            panel_details: None,
            replace_used: 0,
        };
        self.store.create(&transaction).await?;

        info!(
            transaction_id = %transaction_id,
            plan = plan.id,
            panel = %transaction.panel_kind,
            total = total,
            "order created"
        );

        Ok(CreatedOrder {
            transaction_id,
            amount: plan.price,
            fee,
            total,
            qr_image_url: intent.qr_image_url,
            expires_at: intent.expires_at,
        })
    }

    /// Invoice view of one transaction.
    pub async fn get_order(&self, transaction_id: &str) -> AppResult<Transaction> {
        self.store
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found(transaction_id))
    }

    /// Aggregate storefront stats over completed purchases.
    pub async fn stats(&self) -> AppResult<StoreStats> {
        Ok(self.store.stats().await?)
    }

    /// Recent transactions for the public history view, emails masked.
    pub async fn history(&self) -> AppResult<Vec<HistoryEntry>> {
        let transactions = self.store.list_recent(HISTORY_LIMIT).await?;

        Ok(transactions
            .into_iter()
            .map(|tx| {
                let plan_name = self
                    .catalog
                    .find(&tx.plan_id)
                    .map(|p| p.name)
                    .unwrap_or("Unknown Plan");
                HistoryEntry {
                    transaction_id: tx.transaction_id,
                    email: mask_email(&tx.email),
                    plan_id: tx.plan_id,
                    plan_name: plan_name.to_string(),
                    total: tx.total,
                    status: tx.status,
                    created_at: tx.created_at,
                }
            })
            .collect())
    }
}

/// Deterministic surcharge within the configured bounds.
pub fn compute_fee(price: u64, fees: &FeeConfig) -> u64 {
    let span = u64::from(fees.max - fees.min) + 1;
    u64::from(fees.min) + price % span
}

fn generate_transaction_id() -> String {
    format!("TRX-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_is_deterministic_and_bounded() {
        let fees = FeeConfig { min: 10, max: 50 };

        let fee = compute_fee(15000, &fees);
        assert_eq!(fee, compute_fee(15000, &fees));
        assert!(fee >= 10 && fee <= 50);

        for price in [0, 1, 999, 15000, 100000] {
            let fee = compute_fee(price, &fees);
            assert!(fee >= 10 && fee <= 50, "fee {} out of bounds", fee);
            assert_eq!(price + fee, price + compute_fee(price, &fees));
        }
    }

    #[test]
    fn fee_collapses_when_bounds_are_equal() {
        let fees = FeeConfig { min: 25, max: 25 };
        assert_eq!(compute_fee(15000, &fees), 25);
        assert_eq!(compute_fee(0, &fees), 25);
    }

    #[test]
    fn transaction_ids_are_opaque_and_unique() {
        let a = generate_transaction_id();
        let b = generate_transaction_id();
        assert!(a.starts_with("TRX-"));
        assert_eq!(a.len(), 4 + 32);
        assert_ne!(a, b);
    }
}
