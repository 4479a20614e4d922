use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::{BackendError, BackendResult};

/// Trait for components that need to be notified of transaction lifecycle events.
///
/// Components implementing this trait can be registered with a
/// [`PgSession`](crate::PgSession) to receive callbacks once the session's
/// transaction has been committed or rolled back. This lets repositories
/// update caches or drop in-memory changes alongside the database.
#[async_trait]
pub trait TransactionAware: Send + Sync {
    /// Called after a successful transaction commit.
    async fn on_commit(&self) -> BackendResult<()>;

    /// Called after a successful transaction rollback.
    ///
    /// Implementations should revert any in-memory state changes made during
    /// the transaction.
    async fn on_rollback(&self) -> BackendResult<()>;
}

/// Finalization a transaction went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Commit,
    Rollback,
}

/// Observers registered on one transaction.
///
/// Clones share the same list, so components registered through any clone
/// are notified when the transaction is finalized.
#[derive(Clone, Default)]
pub struct TransactionObservers {
    observers: Arc<RwLock<Vec<Arc<dyn TransactionAware>>>>,
}

impl TransactionObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component that needs to be notified of transaction events.
    pub fn register(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Notify every observer of `event`, in registration order.
    ///
    /// The transaction is already finalized when this runs, so a failing
    /// callback does not stop the others. Failures are logged and returned;
    /// they say nothing about whether the commit or rollback itself succeeded.
    pub async fn notify(&self, event: TransactionEvent) -> Vec<BackendError> {
        let observers = self.observers.read().clone();
        let mut failures = Vec::new();
        for observer in observers.iter() {
            let result = match event {
                TransactionEvent::Commit => observer.on_commit().await,
                TransactionEvent::Rollback => observer.on_rollback().await,
            };
            if let Err(err) = result {
                warn!(?event, error = %err, "transaction observer failed");
                failures.push(err);
            }
        }
        failures
    }
}

impl fmt::Debug for TransactionObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionObservers")
            .field("len", &self.len())
            .finish()
    }
}
