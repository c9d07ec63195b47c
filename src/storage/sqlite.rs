//! SQLite-backed repository.
//!
//! Rows keep a JSON payload column next to a few indexed columns for querying;
//! all database work runs on the blocking pool so repository calls never stall
//! an async worker thread.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::models::{NetworkTransaction, RuleApplicationResult};
use crate::storage::TransactionRepository;

pub struct SqliteRepository {
    db: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SqliteRepository {
    pub fn new(base_path: &Path) -> anyhow::Result<Self> {
        if !base_path.exists() {
            fs::create_dir_all(base_path)
                .with_context(|| format!("creating storage directory {:?}", base_path))?;
        }
        let db_path = base_path.join("jarvis_traffic.sqlite");
        let conn = Connection::open(&db_path)
            .with_context(|| format!("opening database at {:?}", db_path))?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                started_at INTEGER,
                method TEXT,
                host TEXT,
                status INTEGER,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_started_at
                ON transactions(started_at DESC);
            CREATE INDEX IF NOT EXISTS idx_transactions_host
                ON transactions(host);
            CREATE TABLE IF NOT EXISTS rule_applications (
                rule_id TEXT,
                applied_at INTEGER,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rule_applications_applied_at
                ON rule_applications(applied_at DESC);
            ",
        )?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// `OR IGNORE` for the initial insert (a concurrent terminal update must
    /// not be undone), `OR REPLACE` for updates.
    async fn write_transaction(&self, tx: &NetworkTransaction, replace: bool) -> anyhow::Result<()> {
        let db = Arc::clone(&self.db);
        let payload = serde_json::to_string(tx)?;
        let id = tx.id.clone();
        let started_at = tx.start_time;
        let method = tx.request.method.to_string();
        let host = tx.request.host();
        let status = tx.response.as_ref().map(|r| r.status_code as i64);
        let verb = if replace { "OR REPLACE" } else { "OR IGNORE" };

        tokio::task::spawn_blocking(move || {
            let conn = db.lock().expect("db mutex poisoned");
            conn.execute(
                &format!(
                    "INSERT {verb} INTO transactions
                       (id, started_at, method, host, status, data)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                ),
                params![id, started_at, method, host, status, payload],
            )
            .context("writing transaction")
        })
        .await??;
        Ok(())
    }

    /// Fetch a single transaction by id.
    pub async fn get_transaction(&self, id: &str) -> anyhow::Result<Option<NetworkTransaction>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let result = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<NetworkTransaction>> {
            let conn = db.lock().expect("db mutex poisoned");
            let mut stmt = conn.prepare("SELECT data FROM transactions WHERE id = ?")?;
            let mut rows = stmt.query(params![id])?;
            if let Some(row) = rows.next()? {
                let data: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&data)?))
            } else {
                Ok(None)
            }
        })
        .await??;
        Ok(result)
    }

    /// List recent transactions, newest first.
    pub async fn list_recent(&self, limit: u32) -> anyhow::Result<Vec<NetworkTransaction>> {
        let db = Arc::clone(&self.db);
        let capped = limit.clamp(1, 10_000) as i64;
        let rows = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<NetworkTransaction>> {
            let conn = db.lock().expect("db mutex poisoned");
            let mut stmt = conn
                .prepare("SELECT data FROM transactions ORDER BY started_at DESC LIMIT ?")?;
            let mut rows = stmt.query(params![capped])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let data: String = row.get(0)?;
                out.push(serde_json::from_str(&data)?);
            }
            Ok(out)
        })
        .await??;
        Ok(rows)
    }

    /// List rule-application history, newest first.
    pub async fn list_rule_applications(
        &self,
        limit: u32,
    ) -> anyhow::Result<Vec<RuleApplicationResult>> {
        let db = Arc::clone(&self.db);
        let capped = limit.clamp(1, 10_000) as i64;
        let rows =
            tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<RuleApplicationResult>> {
                let conn = db.lock().expect("db mutex poisoned");
                let mut stmt = conn.prepare(
                    "SELECT data FROM rule_applications ORDER BY applied_at DESC LIMIT ?",
                )?;
                let mut rows = stmt.query(params![capped])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let data: String = row.get(0)?;
                    out.push(serde_json::from_str(&data)?);
                }
                Ok(out)
            })
            .await??;
        Ok(rows)
    }
}

#[async_trait]
impl TransactionRepository for SqliteRepository {
    async fn insert_transaction(&self, transaction: &NetworkTransaction) -> anyhow::Result<()> {
        self.write_transaction(transaction, false).await
    }

    async fn update_transaction(&self, transaction: &NetworkTransaction) -> anyhow::Result<()> {
        self.write_transaction(transaction, true).await
    }

    async fn delete_all_transactions(&self) -> anyhow::Result<u64> {
        let db = Arc::clone(&self.db);
        let deleted = tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
            let conn = db.lock().expect("db mutex poisoned");
            let count = conn.execute("DELETE FROM transactions", [])?;
            conn.execute_batch("VACUUM")?;
            Ok(count as u64)
        })
        .await??;
        tracing::info!("cleared {} transactions", deleted);
        Ok(deleted)
    }

    async fn delete_old_transactions(&self, before_ms: i64) -> anyhow::Result<u64> {
        let db = Arc::clone(&self.db);
        let deleted = tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
            let conn = db.lock().expect("db mutex poisoned");
            let count = conn.execute(
                "DELETE FROM transactions WHERE started_at < ?1",
                params![before_ms],
            )?;
            if count > 0 {
                // Reclaim disk space after deleting rows
                conn.execute_batch("VACUUM")?;
            }
            Ok(count as u64)
        })
        .await??;
        if deleted > 0 {
            tracing::info!("pruned {} transactions older than {}", deleted, before_ms);
        }
        Ok(deleted)
    }

    async fn transaction_count(&self) -> anyhow::Result<u64> {
        let db = Arc::clone(&self.db);
        let count = tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
            let conn = db.lock().expect("db mutex poisoned");
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await??;
        Ok(count)
    }

    async fn insert_rule_application(&self, result: &RuleApplicationResult) -> anyhow::Result<()> {
        let db = Arc::clone(&self.db);
        let payload = serde_json::to_string(result)?;
        let rule_id = result.rule_id.clone();
        let applied_at = result.timestamp;
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().expect("db mutex poisoned");
            conn.execute(
                "INSERT INTO rule_applications (rule_id, applied_at, data)
                 VALUES (?1, ?2, ?3)",
                params![rule_id, applied_at, payload],
            )
            .context("writing rule application")
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpMethod, NetworkRequest, NetworkResponse};
    use tempfile::tempdir;

    fn sample_tx(url: &str, started_at: i64) -> NetworkTransaction {
        let mut request = NetworkRequest::new(url, HttpMethod::Get, Vec::new());
        request.timestamp = started_at;
        NetworkTransaction::new(request)
    }

    #[tokio::test]
    async fn insert_update_and_fetch() {
        let dir = tempdir().expect("temp dir");
        let repo = SqliteRepository::new(dir.path()).expect("repo initializes");

        let tx = sample_tx("https://api.example.com/a", 1_700_000_000_000);
        repo.insert_transaction(&tx).await.expect("insert ok");
        assert_eq!(repo.transaction_count().await.unwrap(), 1);

        let done = tx.clone().with_response(NetworkResponse::new(200, "OK", Vec::new()));
        repo.update_transaction(&done).await.expect("update ok");
        assert_eq!(repo.transaction_count().await.unwrap(), 1);

        let fetched = repo.get_transaction(&tx.id).await.unwrap().unwrap();
        assert!(fetched.is_completed());
        assert_eq!(fetched.response.unwrap().status_code, 200);
    }

    #[tokio::test]
    async fn prune_removes_only_old_rows() {
        let dir = tempdir().expect("temp dir");
        let repo = SqliteRepository::new(dir.path()).expect("repo initializes");

        let old = sample_tx("https://a.test/", 1_000);
        let new = sample_tx("https://b.test/", 2_000);
        repo.insert_transaction(&old).await.unwrap();
        repo.insert_transaction(&new).await.unwrap();

        let deleted = repo.delete_old_transactions(1_500).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = repo.list_recent(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, new.id);
    }

    #[tokio::test]
    async fn clear_all_empties_the_table() {
        let dir = tempdir().expect("temp dir");
        let repo = SqliteRepository::new(dir.path()).expect("repo initializes");

        for i in 0..3 {
            repo.insert_transaction(&sample_tx("https://a.test/", 1_000 + i))
                .await
                .unwrap();
        }
        assert_eq!(repo.delete_all_transactions().await.unwrap(), 3);
        assert_eq!(repo.transaction_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rule_application_history_appends() {
        let dir = tempdir().expect("temp dir");
        let repo = SqliteRepository::new(dir.path()).expect("repo initializes");

        let rule = crate::models::NetworkRule::from_input(crate::models::RuleInput {
            name: "audit".into(),
            ..crate::models::RuleInput::default()
        });
        let first = crate::models::RuleApplicationResult::new(&rule, vec!["add header X".into()]);
        let second = crate::models::RuleApplicationResult::new(&rule, Vec::new());
        repo.insert_rule_application(&first).await.unwrap();
        repo.insert_rule_application(&second).await.unwrap();

        let history = repo.list_rule_applications(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|h| h.applied));
        assert!(history.iter().any(|h| !h.applied));
    }
}
