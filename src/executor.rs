use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{BackendError, BackendResult};

/// Executor wraps the PostgreSQL transaction of one unit of work.
///
/// Clones share the same transaction, so every repository built from the
/// handle returned by `fetch` writes through the same session. Once the unit
/// of work is finalized the slot is empty and queries must not be issued.
#[derive(Clone, Debug)]
pub struct Executor {
    pub tx: Arc<Mutex<Option<Transaction<'static, Postgres>>>>,
}

impl Executor {
    /// Creates a new Executor from a PostgreSQL transaction.
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Whether both executors point at the same transaction.
    pub fn same_transaction(&self, other: &Executor) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }

    /// Whether the transaction is still open.
    pub async fn is_active(&self) -> bool {
        self.tx.lock().await.is_some()
    }

    /// Takes ownership of the transaction, leaving None in its place.
    /// Only the backend's commit and rollback call this.
    pub(crate) async fn take_transaction(&self) -> BackendResult<Transaction<'static, Postgres>> {
        self.tx.lock().await.take().ok_or(BackendError::Finalized)
    }
}
