use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;

use crate::catalog::AccessTier;
use crate::config::DatabaseConfig;
use crate::panel::PanelKind;
use crate::store::{PanelDetails, StoreError, StoreStats, Transaction, TransactionStore, TxStatus};

/// Initialize the Postgres connection pool.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .connect(&config.url)
        .await
        .map_err(from_sqlx)
}

/// Create the payments table when it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS payments (
            transaction_id TEXT PRIMARY KEY,
            provider_transaction_id TEXT NOT NULL,
            username TEXT NOT NULL,
            email TEXT NOT NULL,
            plan_id TEXT NOT NULL,
            amount BIGINT NOT NULL,
            fee BIGINT NOT NULL,
            total BIGINT NOT NULL,
            qr_image_url TEXT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            panel_kind TEXT NOT NULL,
            access_tier TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            panel_details JSONB,
            replace_used INT NOT NULL DEFAULT 0
         )",
    )
    .execute(pool)
    .await
    .map_err(from_sqlx)?;

    Ok(())
}

/// Postgres-backed transaction store.
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    transaction_id: String,
    provider_transaction_id: String,
    username: String,
    email: String,
    plan_id: String,
    amount: i64,
    fee: i64,
    total: i64,
    qr_image_url: String,
    expires_at: chrono::DateTime<chrono::Utc>,
    panel_kind: String,
    access_tier: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    panel_details: Option<serde_json::Value>,
    replace_used: i32,
}

const SELECT_COLUMNS: &str = "transaction_id, provider_transaction_id, username, email, plan_id, \
     amount, fee, total, qr_image_url, expires_at, panel_kind, access_tier, \
     status, created_at, panel_details, replace_used";

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, StoreError> {
        let corrupt = |what: &str, value: &str| StoreError::Backend {
            message: format!("corrupt {} '{}' on {}", what, value, row.transaction_id),
            is_retryable: false,
        };

        let status = TxStatus::parse(&row.status).ok_or_else(|| corrupt("status", &row.status))?;
        let panel_kind =
            PanelKind::parse(&row.panel_kind).ok_or_else(|| corrupt("panel kind", &row.panel_kind))?;
        let access = AccessTier::parse(&row.access_tier)
            .ok_or_else(|| corrupt("access tier", &row.access_tier))?;
        let panel_details = row
            .panel_details
            .map(|v| {
                serde_json::from_value::<PanelDetails>(v)
                    .map_err(|e| corrupt("panel details", &e.to_string()))
            })
            .transpose()?;

        Ok(Transaction {
            transaction_id: row.transaction_id,
            provider_transaction_id: row.provider_transaction_id,
            username: row.username,
            email: row.email,
            plan_id: row.plan_id,
            amount: row.amount as u64,
            fee: row.fee as u64,
            total: row.total as u64,
            qr_image_url: row.qr_image_url,
            expires_at: row.expires_at,
            panel_kind,
            access,
            status,
            created_at: row.created_at,
            panel_details,
            replace_used: row.replace_used as u32,
        })
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn create(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let panel_details = transaction
            .panel_details
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Backend {
                message: format!("failed to encode panel details: {}", e),
                is_retryable: false,
            })?;

        let result = sqlx::query(
            "INSERT INTO payments (transaction_id, provider_transaction_id, username, email, \
             plan_id, amount, fee, total, qr_image_url, expires_at, panel_kind, access_tier, \
             status, created_at, panel_details, replace_used) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(&transaction.transaction_id)
        .bind(&transaction.provider_transaction_id)
        .bind(&transaction.username)
        .bind(&transaction.email)
        .bind(&transaction.plan_id)
        .bind(transaction.amount as i64)
        .bind(transaction.fee as i64)
        .bind(transaction.total as i64)
        .bind(&transaction.qr_image_url)
        .bind(transaction.expires_at)
        .bind(transaction.panel_kind.as_str())
        .bind(transaction.access.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .bind(panel_details)
        .bind(transaction.replace_used as i32)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Duplicate {
                    transaction_id: transaction.transaction_id.clone(),
                })
            }
            Err(e) => Err(from_sqlx(e)),
        }
    }

    async fn find_by_id(&self, transaction_id: &str) -> Result<Option<Transaction>, StoreError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE transaction_id = $1",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;

        row.map(Transaction::try_from).transpose()
    }

    async fn update_status(
        &self,
        transaction_id: &str,
        status: TxStatus,
        panel_details: Option<&PanelDetails>,
    ) -> Result<bool, StoreError> {
        let details = panel_details
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Backend {
                message: format!("failed to encode panel details: {}", e),
                is_retryable: false,
            })?;

        let result = sqlx::query(
            "UPDATE payments SET status = $2, panel_details = COALESCE($3, panel_details) \
             WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .bind(status.as_str())
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_replace_used(
        &self,
        transaction_id: &str,
    ) -> Result<Option<u32>, StoreError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE payments SET replace_used = replace_used + 1 \
             WHERE transaction_id = $1 RETURNING replace_used",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;

        Ok(row.map(|(count,)| count as u32))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Transaction>, StoreError> {
        let sql = format!(
            "SELECT {} FROM payments ORDER BY created_at DESC LIMIT $1",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let (total_purchases, total_users): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(DISTINCT username) FROM payments WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx)?;

        Ok(StoreStats {
            total_purchases: total_purchases as u64,
            total_users: total_users as u64,
        })
    }
}

fn from_sqlx(err: sqlx::Error) -> StoreError {
    let is_retryable = matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    );
    StoreError::Backend {
        message: err.to_string(),
        is_retryable,
    }
}
