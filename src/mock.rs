use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

use crate::{BackendError, BackendResult, Context, TransactionalBackend, TxContext};

/// Shared string value standing in for application state.
///
/// Every access takes the lock, so concurrent units of work are free of data
/// races, but there is no isolation at all: they see each other's writes as
/// soon as they happen. This is a testing aid and must not be taken as a
/// model for how a real backend isolates transactions.
#[derive(Debug, Default)]
pub struct State {
    value: Mutex<String>,
}

impl State {
    pub fn set_value(&self, value: impl Into<String>) {
        *self.value.lock() = value.into();
    }

    pub fn value(&self) -> String {
        self.value.lock().clone()
    }

    /// Marks the value as committed.
    pub fn commit(&self) {
        self.value.lock().push_str(" commited!");
    }

    /// Marks the value as rolled back.
    pub fn rollback(&self) {
        self.value.lock().push_str(" rolled back!");
    }
}

/// Session handed out by [`MockBackend::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSession {
    pub id: Uuid,
}

#[derive(Debug, Default)]
struct Ledger {
    acquired: Vec<Uuid>,
    committed: Vec<Uuid>,
    rolled_back: Vec<Uuid>,
}

/// In-memory backend simulating a transaction over a single [`State`].
///
/// Failures can be injected on each backend call, and every session the
/// backend hands out or finalizes is recorded for later inspection.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Arc<State>,
    ledger: Mutex<Ledger>,
    fail_acquire: bool,
    fail_commit: bool,
    fail_rollback: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `acquire` fail with [`BackendError::Unavailable`].
    pub fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    /// Make every `commit` fail with [`BackendError::CommitFailed`].
    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Make every `rollback` fail with [`BackendError::RollbackFailed`].
    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    /// Sessions handed out so far, in order.
    pub fn acquired(&self) -> Vec<Uuid> {
        self.ledger.lock().acquired.clone()
    }

    /// Sessions that reached `commit`, including failed attempts.
    pub fn committed(&self) -> Vec<Uuid> {
        self.ledger.lock().committed.clone()
    }

    /// Sessions that reached `rollback`, including failed attempts.
    pub fn rolled_back(&self) -> Vec<Uuid> {
        self.ledger.lock().rolled_back.clone()
    }
}

#[async_trait]
impl TransactionalBackend for MockBackend {
    type Session = MockSession;
    type Data = Arc<State>;

    async fn acquire(&self, parent: &Context) -> BackendResult<TxContext<MockSession>> {
        parent.check()?;
        if self.fail_acquire {
            return Err(BackendError::Unavailable("mock backend refused to begin".into()));
        }
        let session = MockSession { id: Uuid::new_v4() };
        self.ledger.lock().acquired.push(session.id);
        trace!(session = %session.id, "mock session acquired");
        Ok(TxContext::new(parent.clone(), session))
    }

    fn fetch(&self, _ctx: &TxContext<MockSession>) -> Arc<State> {
        Arc::clone(&self.state)
    }

    async fn commit(&self, ctx: TxContext<MockSession>) -> BackendResult<()> {
        let Some(session) = ctx.session() else {
            return Ok(());
        };
        self.ledger.lock().committed.push(session.id);
        if self.fail_commit {
            return Err(BackendError::CommitFailed("mock commit failure".into()));
        }
        self.state.commit();
        Ok(())
    }

    async fn rollback(&self, ctx: TxContext<MockSession>) -> BackendResult<()> {
        let Some(session) = ctx.session() else {
            return Ok(());
        };
        self.ledger.lock().rolled_back.push(session.id);
        if self.fail_rollback {
            return Err(BackendError::RollbackFailed("mock rollback failure".into()));
        }
        self.state.rollback();
        Ok(())
    }
}
