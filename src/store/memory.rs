use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::store::{PanelDetails, StoreError, StoreStats, Transaction, TransactionStore, TxStatus};

/// In-memory transaction store.
///
/// Backs the test suites and single-instance development runs; semantics
/// match the Postgres store (including duplicate detection and the
/// matched-row result on updates).
#[derive(Default)]
pub struct InMemoryTransactionStore {
    inner: RwLock<HashMap<String, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.contains_key(&transaction.transaction_id) {
            return Err(StoreError::Duplicate {
                transaction_id: transaction.transaction_id.clone(),
            });
        }
        inner.insert(transaction.transaction_id.clone(), transaction.clone());
        Ok(())
    }

    async fn find_by_id(&self, transaction_id: &str) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.read().await.get(transaction_id).cloned())
    }

    async fn update_status(
        &self,
        transaction_id: &str,
        status: TxStatus,
        panel_details: Option<&PanelDetails>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.get_mut(transaction_id) {
            Some(transaction) => {
                transaction.status = status;
                if let Some(details) = panel_details {
                    transaction.panel_details = Some(details.clone());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_replace_used(
        &self,
        transaction_id: &str,
    ) -> Result<Option<u32>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.get_mut(transaction_id) {
            Some(transaction) => {
                transaction.replace_used += 1;
                Ok(Some(transaction.replace_used))
            }
            None => Ok(None),
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().await;
        let mut all: Vec<Transaction> = inner.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit);
        Ok(all)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let inner = self.inner.read().await;
        let completed = inner
            .values()
            .filter(|tx| tx.status == TxStatus::Completed);

        let mut total_purchases = 0u64;
        let mut usernames = std::collections::HashSet::new();
        for tx in completed {
            total_purchases += 1;
            usernames.insert(tx.username.as_str());
        }

        Ok(StoreStats {
            total_purchases,
            total_users: usernames.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AccessTier;
    use crate::panel::PanelKind;
    use chrono::{Duration, Utc};

    fn transaction(id: &str) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            provider_transaction_id: format!("SKR-{}", id),
            username: "budi".to_string(),
            email: "budi@example.com".to_string(),
            plan_id: "1gb".to_string(),
            amount: 15000,
            fee: 12,
            total: 15012,
            qr_image_url: "https://cdn.example/qr.png".to_string(),
            expires_at: Utc::now() + Duration::hours(24),
            panel_kind: PanelKind::Private,
            access: AccessTier::Regular,
            status: TxStatus::Pending,
            created_at: Utc::now(),
            panel_details: None,
            replace_used: 0,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = InMemoryTransactionStore::new();
        store.create(&transaction("TRX-1")).await.expect("first insert");

        let err = store
            .create(&transaction("TRX-1"))
            .await
            .expect_err("duplicate id must be rejected");
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn update_status_reports_matched_rows() {
        let store = InMemoryTransactionStore::new();
        store.create(&transaction("TRX-1")).await.expect("insert");

        let matched = store
            .update_status("TRX-1", TxStatus::Paid, None)
            .await
            .expect("update");
        assert!(matched);

        let missed = store
            .update_status("TRX-404", TxStatus::Paid, None)
            .await
            .expect("update");
        assert!(!missed);
    }

    #[tokio::test]
    async fn increment_replace_counts_up_from_zero() {
        let store = InMemoryTransactionStore::new();
        store.create(&transaction("TRX-1")).await.expect("insert");

        assert_eq!(
            store.increment_replace_used("TRX-1").await.expect("incr"),
            Some(1)
        );
        assert_eq!(
            store.increment_replace_used("TRX-1").await.expect("incr"),
            Some(2)
        );
        assert_eq!(
            store.increment_replace_used("TRX-404").await.expect("incr"),
            None
        );
    }

    #[tokio::test]
    async fn stats_count_completed_purchases_and_distinct_buyers() {
        let store = InMemoryTransactionStore::new();

        // Two completed purchases by budi, one by sari, one still pending.
        for (id, username, status) in [
            ("TRX-1", "budi", TxStatus::Completed),
            ("TRX-2", "budi", TxStatus::Completed),
            ("TRX-3", "sari", TxStatus::Completed),
            ("TRX-4", "joko", TxStatus::Pending),
        ] {
            let mut tx = transaction(id);
            tx.username = username.to_string();
            tx.status = status;
            store.create(&tx).await.expect("insert");
        }

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.total_purchases, 3);
        assert_eq!(stats.total_users, 2);
    }

    #[tokio::test]
    async fn list_recent_is_newest_first_and_capped() {
        let store = InMemoryTransactionStore::new();
        for i in 0..5 {
            let mut tx = transaction(&format!("TRX-{}", i));
            tx.created_at = Utc::now() + Duration::seconds(i);
            store.create(&tx).await.expect("insert");
        }

        let recent = store.list_recent(3).await.expect("list");
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].transaction_id, "TRX-4");
        assert_eq!(recent[2].transaction_id, "TRX-2");
    }
}
