//! Unit-of-work provider.
//!
//! Every repository call goes through [`Database::read`] or [`Database::write`]:
//! one pooled connection, one transaction, committed when the operation
//! returns `Ok` and rolled back otherwise. The connection goes back to the
//! pool on every exit path, including timeouts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{Transaction, TransactionBehavior};
use tokio::time::Instant;

use crate::db::DbPool;
use crate::repository::RepositoryError;

#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    op_timeout: Duration,
}

impl Database {
    pub fn new(pool: DbPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// Run `op` inside a deferred transaction.
    pub async fn read<T, F>(&self, op: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, RepositoryError> + Send + 'static,
    {
        self.run(TransactionBehavior::Deferred, op).await
    }

    /// Run `op` inside an immediate transaction, taking the write lock up front
    /// so concurrent writers queue on `busy_timeout` instead of failing mid-way.
    pub async fn write<T, F>(&self, op: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, RepositoryError> + Send + 'static,
    {
        self.run(TransactionBehavior::Immediate, op).await
    }

    async fn run<T, F>(&self, behavior: TransactionBehavior, op: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, RepositoryError> + Send + 'static,
    {
        let deadline = Instant::now() + self.op_timeout;

        let pool = self.pool.clone();
        let conn = match tokio::time::timeout_at(
            deadline,
            tokio::task::spawn_blocking(move || pool.get()),
        )
        .await
        {
            Ok(acquired) => acquired??,
            Err(_) => return Err(RepositoryError::Timeout(self.op_timeout)),
        };

        let interrupt = conn.get_interrupt_handle();
        let expired = Arc::new(AtomicBool::new(false));
        let worker_expired = Arc::clone(&expired);
        let op_timeout = self.op_timeout;

        let work = tokio::task::spawn_blocking(move || -> Result<T, RepositoryError> {
            let mut conn = conn;
            let tx = conn.transaction_with_behavior(behavior)?;
            match op(&tx) {
                // The caller has already been told this call failed.
                Ok(_) if worker_expired.load(Ordering::SeqCst) => {
                    tx.rollback()?;
                    Err(RepositoryError::Timeout(op_timeout))
                }
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        tracing::warn!("Rollback failed: {}", rollback_err);
                    }
                    Err(err)
                }
            }
        });

        match tokio::time::timeout_at(deadline, work).await {
            Ok(joined) => joined?,
            Err(_) => {
                // Set before interrupting so a worker between statements rolls back too.
                expired.store(true, Ordering::SeqCst);
                interrupt.interrupt();
                tracing::warn!(
                    "Database operation exceeded {:?}, interrupted",
                    self.op_timeout
                );
                Err(RepositoryError::Timeout(self.op_timeout))
            }
        }
    }
}
