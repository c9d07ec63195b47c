//! The persistence boundary between the network path and storage.
//!
//! Every entry point dispatches its repository write onto the tokio runtime
//! and returns immediately: no caller ever waits on storage I/O, and a slow or
//! failing repository can only ever cost a log line. Writes for different
//! transactions run concurrently; each is keyed by the transaction id.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::models::{NetworkTransaction, RuleApplicationResult};
use crate::storage::TransactionRepository;

#[derive(Default)]
struct PendingWrites {
    count: AtomicUsize,
    notify: Notify,
}

impl PendingWrites {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn end(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }
}

pub struct Collector {
    repository: Arc<dyn TransactionRepository>,
    pending: Arc<PendingWrites>,
}

impl Collector {
    pub fn new(repository: Arc<dyn TransactionRepository>) -> Self {
        Self {
            repository,
            pending: Arc::new(PendingWrites::default()),
        }
    }

    /// The request has left the interceptor; record the PENDING transaction.
    /// Dispatched before the outcome of the call is known.
    pub fn on_request_sent(&self, transaction: NetworkTransaction) {
        let repository = Arc::clone(&self.repository);
        self.spawn_write("request sent", async move {
            repository.insert_transaction(&transaction).await
        });
    }

    /// A response (real or mocked) completed the transaction.
    pub fn on_response_received(&self, transaction: NetworkTransaction) {
        let repository = Arc::clone(&self.repository);
        self.spawn_write("response received", async move {
            repository.update_transaction(&transaction).await
        });
    }

    /// The underlying call failed; the transaction carries the error message.
    pub fn on_failure(&self, transaction: NetworkTransaction, error: &str) {
        tracing::debug!(id = %transaction.id, error, "recording failed transaction");
        let repository = Arc::clone(&self.repository);
        self.spawn_write("failure", async move {
            repository.update_transaction(&transaction).await
        });
    }

    /// Append one rule application to the audit history.
    pub fn on_rule_applied(&self, result: RuleApplicationResult) {
        let repository = Arc::clone(&self.repository);
        self.spawn_write("rule applied", async move {
            repository.insert_rule_application(&result).await
        });
    }

    /// Fire-and-forget maintenance: drop every stored transaction.
    pub fn clear_all(&self) {
        let repository = Arc::clone(&self.repository);
        self.spawn_write("clear all", async move {
            repository.delete_all_transactions().await.map(|_| ())
        });
    }

    /// Fire-and-forget maintenance: drop transactions started before the
    /// given timestamp (ms).
    pub fn clear_old_transactions(&self, before_ms: i64) {
        let repository = Arc::clone(&self.repository);
        self.spawn_write("clear old", async move {
            repository.delete_old_transactions(before_ms).await.map(|_| ())
        });
    }

    /// Stored transaction count; 0 when the repository fails.
    pub async fn transaction_count(&self) -> u64 {
        match self.repository.transaction_count().await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("transaction count unavailable: {err:#}");
                0
            }
        }
    }

    /// Await completion of every write dispatched so far. Production code
    /// never needs this; tests use it to make fire-and-forget writes
    /// observable deterministically.
    pub async fn flush(&self) {
        loop {
            let notified = self.pending.notify.notified();
            if self.pending.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn spawn_write<F>(&self, label: &'static str, write: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        pending.begin();
        tokio::spawn(async move {
            if let Err(err) = write.await {
                // Storage is best-effort from the network path's view.
                tracing::warn!("collector write ({label}) failed: {err:#}");
            }
            pending.end();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpMethod, NetworkRequest, NetworkResponse, NetworkRule, RuleInput};
    use crate::storage::MemoryRepository;
    use async_trait::async_trait;

    struct FailingRepository;

    #[async_trait]
    impl TransactionRepository for FailingRepository {
        async fn insert_transaction(&self, _: &NetworkTransaction) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn update_transaction(&self, _: &NetworkTransaction) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn delete_all_transactions(&self) -> anyhow::Result<u64> {
            anyhow::bail!("disk full")
        }
        async fn delete_old_transactions(&self, _: i64) -> anyhow::Result<u64> {
            anyhow::bail!("disk full")
        }
        async fn transaction_count(&self) -> anyhow::Result<u64> {
            anyhow::bail!("disk full")
        }
        async fn insert_rule_application(&self, _: &RuleApplicationResult) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn transaction() -> NetworkTransaction {
        NetworkTransaction::new(NetworkRequest::new(
            "https://example.com/x",
            HttpMethod::Get,
            Vec::new(),
        ))
    }

    #[tokio::test]
    async fn lifecycle_events_reach_the_repository() {
        let repo = Arc::new(MemoryRepository::new());
        let collector = Collector::new(repo.clone());

        let tx = transaction();
        collector.on_request_sent(tx.clone());
        collector.flush().await;
        assert_eq!(repo.get(&tx.id).unwrap().status, tx.status);

        let done = tx.with_response(NetworkResponse::new(200, "OK", Vec::new()));
        collector.on_response_received(done.clone());
        collector.flush().await;
        assert!(repo.get(&done.id).unwrap().is_completed());
        assert_eq!(collector.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn repository_failures_are_swallowed() {
        let collector = Collector::new(Arc::new(FailingRepository));

        let tx = transaction();
        collector.on_request_sent(tx.clone());
        collector.on_failure(tx.with_error("boom"), "boom");
        collector.clear_all();
        collector.clear_old_transactions(0);
        collector.flush().await;

        // Count degrades to zero instead of propagating the error.
        assert_eq!(collector.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn rule_applications_append() {
        let repo = Arc::new(MemoryRepository::new());
        let collector = Collector::new(repo.clone());

        let rule = NetworkRule::from_input(RuleInput {
            name: "audit".into(),
            ..RuleInput::default()
        });
        collector.on_rule_applied(RuleApplicationResult::new(&rule, vec!["x".into()]));
        collector.on_rule_applied(RuleApplicationResult::new(&rule, Vec::new()));
        collector.flush().await;

        assert_eq!(repo.rule_applications().len(), 2);
    }

    #[tokio::test]
    async fn maintenance_operations_apply() {
        let repo = Arc::new(MemoryRepository::new());
        let collector = Collector::new(repo.clone());

        let mut old = transaction();
        old.start_time = 1_000;
        let mut new = transaction();
        new.start_time = 2_000;
        collector.on_request_sent(old.clone());
        collector.on_request_sent(new.clone());
        collector.flush().await;

        collector.clear_old_transactions(1_500);
        collector.flush().await;
        assert!(repo.get(&old.id).is_none());
        assert!(repo.get(&new.id).is_some());

        collector.clear_all();
        collector.flush().await;
        assert_eq!(collector.transaction_count().await, 0);
    }
}
