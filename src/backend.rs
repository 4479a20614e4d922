use async_trait::async_trait;

use crate::{BackendResult, Context};

/// Transaction-scoped execution context.
///
/// Produced by [`TransactionalBackend::acquire`] once per unit of work and
/// consumed by exactly one of `commit` or `rollback`. The operation receives a
/// clone; it must not keep that clone once it has returned.
#[derive(Clone, Debug)]
pub struct TxContext<S> {
    parent: Context,
    session: Option<S>,
}

impl<S> TxContext<S> {
    /// Bind a backend session to the caller's context.
    pub fn new(parent: Context, session: S) -> Self {
        Self {
            parent,
            session: Some(session),
        }
    }

    /// A context with no session attached.
    ///
    /// Fetching through it yields the backend's non-transactional view of the
    /// resource, and finalizing it is a no-op.
    pub fn detached(parent: Context) -> Self {
        Self {
            parent,
            session: None,
        }
    }

    pub fn parent(&self) -> &Context {
        &self.parent
    }

    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    pub fn is_transactional(&self) -> bool {
        self.session.is_some()
    }
}

/// Contract every transactional resource adapter has to satisfy.
///
/// For each successful [`acquire`](Self::acquire) exactly one of
/// [`commit`](Self::commit) or [`rollback`](Self::rollback) is called, and the
/// session must be released on both paths even if the underlying call fails.
///
/// The coordinator adds no mutual exclusion: an implementation whose resource
/// cannot run independent sessions concurrently has to serialize internally.
#[async_trait]
pub trait TransactionalBackend: Send + Sync {
    /// Backend state bound to one active transaction.
    type Session: Clone + Send + Sync + 'static;

    /// Handle handed to the caller inside a unit of work.
    type Data;

    /// Begin a new transaction scoped to `parent`.
    async fn acquire(&self, parent: &Context) -> BackendResult<TxContext<Self::Session>>;

    /// Data bound to the transaction in `ctx`, or the default view when `ctx`
    /// carries no session.
    fn fetch(&self, ctx: &TxContext<Self::Session>) -> Self::Data;

    /// Persist the transaction's changes and release its session.
    async fn commit(&self, ctx: TxContext<Self::Session>) -> BackendResult<()>;

    /// Discard the transaction's changes and release its session.
    async fn rollback(&self, ctx: TxContext<Self::Session>) -> BackendResult<()>;
}
