//! Transaction persistence
//!
//! A single `payments` record type behind the `TransactionStore` trait:
//! create, fetch by id, status update (optionally attaching provisioning
//! details), replacement-counter increment, recent history. The store holds
//! no business logic; lifecycle monotonicity is enforced by callers.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryTransactionStore;
pub use postgres::PgTransactionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::AccessTier;
use crate::panel::PanelKind;

/// Lifecycle status of a payment transaction.
///
/// Monotonic: pending → paid → completed, or pending|paid → failed.
/// Completed and failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Paid,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Paid => "paid",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TxStatus::Pending),
            "paid" => Some(TxStatus::Paid),
            "completed" => Some(TxStatus::Completed),
            "failed" => Some(TxStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Completed | TxStatus::Failed)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized copy of the provisioned panel account, present iff the
/// transaction is completed. The panel itself stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelDetails {
    pub username: String,
    pub password: String,
    pub server_id: u64,
    pub panel_url: String,
}

/// The central payments record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub provider_transaction_id: String,
    pub username: String,
    pub email: String,
    pub plan_id: String,
    pub amount: u64,
    pub fee: u64,
    pub total: u64,
    pub qr_image_url: String,
    pub expires_at: DateTime<Utc>,
    pub panel_kind: PanelKind,
    pub access: AccessTier,
    pub status: TxStatus,
    pub created_at: DateTime<Utc>,
    pub panel_details: Option<PanelDetails>,
    pub replace_used: u32,
}

impl Transaction {
    /// Whether the payment window has passed. Expiry is a derived fact, not
    /// a stored status.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Transaction '{transaction_id}' already exists")]
    Duplicate { transaction_id: String },

    #[error("Store error: {message}")]
    Backend { message: String, is_retryable: bool },
}

impl From<StoreError> for crate::error::AppError {
    fn from(err: StoreError) -> Self {
        use crate::error::{AppError, AppErrorKind, DomainError, InfrastructureError};

        let kind = match &err {
            StoreError::Duplicate { transaction_id } => {
                AppErrorKind::Domain(DomainError::DuplicateTransaction {
                    transaction_id: transaction_id.clone(),
                })
            }
            StoreError::Backend {
                message,
                is_retryable,
            } => AppErrorKind::Infrastructure(InfrastructureError::Database {
                message: message.clone(),
                is_retryable: *is_retryable,
            }),
        };
        AppError::new(kind)
    }
}

/// Aggregate counts over completed transactions, for the public stats view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_purchases: u64,
    pub total_users: u64,
}

/// CRUD over payment transactions; no lifecycle validation here.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a new transaction. Fails with [`StoreError::Duplicate`] on an
    /// id collision.
    async fn create(&self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Fetch by id; absent is `None`, not an error.
    async fn find_by_id(&self, transaction_id: &str) -> Result<Option<Transaction>, StoreError>;

    /// Set the status, attaching panel details when given. Returns whether a
    /// record was matched.
    async fn update_status(
        &self,
        transaction_id: &str,
        status: TxStatus,
        panel_details: Option<&PanelDetails>,
    ) -> Result<bool, StoreError>;

    /// Bump the warranty replacement counter; returns the new count, or
    /// `None` when the transaction does not exist.
    async fn increment_replace_used(&self, transaction_id: &str)
        -> Result<Option<u32>, StoreError>;

    /// Most recent transactions, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Transaction>, StoreError>;

    /// Completed-purchase count and distinct buyer count.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
