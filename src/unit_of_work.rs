use std::error::Error as StdError;
use std::future::Future;

use tracing::debug;

use crate::{Context, TransactionalBackend, TxContext, UnitOfWorkError};

/// Unit of Work pattern for running an operation inside a transaction.
///
/// The UnitOfWork owns one backend and enforces the
/// acquire / operate / commit-or-rollback discipline around every call to
/// [`execute`](Self::execute). It keeps no state between calls, so a single
/// instance can be reused (and shared behind an `Arc`) for many units of work,
/// as far as the backend allows.
#[derive(Debug, Clone)]
pub struct UnitOfWork<B> {
    backend: B,
}

impl<B: TransactionalBackend> UnitOfWork<B> {
    /// Create a new UnitOfWork around the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Backend data for `ctx`; see [`TransactionalBackend::fetch`].
    pub fn fetch(&self, ctx: &TxContext<B::Session>) -> B::Data {
        self.backend.fetch(ctx)
    }

    /// Run `operation` inside a new transaction.
    ///
    /// The transaction is committed when the operation returns `Ok` and
    /// rolled back when it returns `Err`. The operation's value is returned
    /// only once the commit has succeeded.
    #[tracing::instrument(level = "debug", name = "unit_of_work", skip_all, fields(context = %parent.id()))]
    pub async fn execute<F, Fut, T, E>(
        &self,
        parent: &Context,
        operation: F,
    ) -> Result<T, UnitOfWorkError<E>>
    where
        F: FnOnce(TxContext<B::Session>) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: StdError + Send + Sync + 'static,
    {
        let ctx = self
            .backend
            .acquire(parent)
            .await
            .map_err(UnitOfWorkError::Acquire)?;
        debug!("transaction started");

        match operation(ctx.clone()).await {
            Ok(value) => {
                self.backend
                    .commit(ctx)
                    .await
                    .map_err(UnitOfWorkError::Commit)?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(operation) => match self.backend.rollback(ctx).await {
                Ok(()) => {
                    debug!("transaction rolled back");
                    Err(UnitOfWorkError::Operation(operation))
                }
                Err(rollback) => Err(UnitOfWorkError::RollbackFailed {
                    operation,
                    rollback,
                }),
            },
        }
    }
}
