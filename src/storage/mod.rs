//! Durable transaction storage.
//!
//! The collector writes through [`TransactionRepository`]; two implementations
//! ship with the SDK: an in-memory repository for tests and ephemeral
//! sessions, and the default SQLite-backed repository.

mod memory;
mod sqlite;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;

use crate::models::{NetworkTransaction, RuleApplicationResult};

/// Storage boundary consumed by the collector.
///
/// Implementations must tolerate concurrent invocation: many transactions are
/// written at once and each write is keyed by the transaction's unique id.
/// Callers may observe a request-only record with no terminal state (the
/// update write is fire-and-forget and may never arrive).
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Create the record for a new transaction. Must not clobber an existing
    /// record with the same id: the paired update may already have landed,
    /// and a terminal record beats a PENDING one.
    async fn insert_transaction(&self, transaction: &NetworkTransaction) -> anyhow::Result<()>;

    /// Upsert by id; the paired insert may still be in flight.
    async fn update_transaction(&self, transaction: &NetworkTransaction) -> anyhow::Result<()>;

    async fn delete_all_transactions(&self) -> anyhow::Result<u64>;

    /// Delete transactions that started before the given timestamp (ms).
    async fn delete_old_transactions(&self, before_ms: i64) -> anyhow::Result<u64>;

    async fn transaction_count(&self) -> anyhow::Result<u64>;

    /// Append to the rule-application history.
    async fn insert_rule_application(&self, result: &RuleApplicationResult) -> anyhow::Result<()>;
}
