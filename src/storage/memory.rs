//! In-memory repository, keyed by transaction id.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::models::{NetworkTransaction, RuleApplicationResult};
use crate::storage::TransactionRepository;

#[derive(Default)]
pub struct MemoryRepository {
    transactions: DashMap<String, NetworkTransaction>,
    rule_applications: RwLock<Vec<RuleApplicationResult>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<NetworkTransaction> {
        self.transactions.get(id).map(|entry| entry.clone())
    }

    /// Snapshot of every stored transaction, in no particular order.
    pub fn transactions(&self) -> Vec<NetworkTransaction> {
        self.transactions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn rule_applications(&self) -> Vec<RuleApplicationResult> {
        self.rule_applications.read().clone()
    }
}

#[async_trait]
impl TransactionRepository for MemoryRepository {
    async fn insert_transaction(&self, transaction: &NetworkTransaction) -> anyhow::Result<()> {
        // Create-if-absent: a concurrent terminal update must not be undone.
        self.transactions
            .entry(transaction.id.clone())
            .or_insert_with(|| transaction.clone());
        Ok(())
    }

    async fn update_transaction(&self, transaction: &NetworkTransaction) -> anyhow::Result<()> {
        self.transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    async fn delete_all_transactions(&self) -> anyhow::Result<u64> {
        let removed = self.transactions.len() as u64;
        self.transactions.clear();
        Ok(removed)
    }

    async fn delete_old_transactions(&self, before_ms: i64) -> anyhow::Result<u64> {
        let before_len = self.transactions.len();
        self.transactions.retain(|_, tx| tx.start_time >= before_ms);
        Ok((before_len - self.transactions.len()) as u64)
    }

    async fn transaction_count(&self) -> anyhow::Result<u64> {
        Ok(self.transactions.len() as u64)
    }

    async fn insert_rule_application(&self, result: &RuleApplicationResult) -> anyhow::Result<()> {
        self.rule_applications.write().push(result.clone());
        Ok(())
    }
}
