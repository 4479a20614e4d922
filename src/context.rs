use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use uuid::Uuid;

use crate::{BackendError, BackendResult};

#[derive(Debug, Default)]
struct CancelSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Ambient carrier of cancellation, deadline and correlation data.
///
/// A `Context` is threaded into [`UnitOfWork::execute`](crate::UnitOfWork::execute)
/// and handed to the backend when a transaction is started. Clones and
/// derived contexts share the same cancellation signal, so cancelling any of
/// them cancels all of them.
#[derive(Clone, Debug)]
pub struct Context {
    id: Uuid,
    deadline: Option<Instant>,
    signal: Arc<CancelSignal>,
}

impl Context {
    /// A root context with no deadline and a fresh correlation id.
    pub fn background() -> Self {
        Self {
            id: Uuid::new_v4(),
            deadline: None,
            signal: Arc::new(CancelSignal::default()),
        }
    }

    /// Derive a context that expires at `deadline`.
    ///
    /// If this context already expires earlier, the earlier deadline wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            id: self.id,
            deadline: Some(deadline),
            signal: Arc::clone(&self.signal),
        }
    }

    /// Derive a context that expires `timeout` from now.
    ///
    /// A timeout too large to represent leaves the current deadline as is.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    /// Correlation id shared by this context and everything derived from it.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Signal cancellation to every holder of this context.
    pub fn cancel(&self) {
        self.signal.cancelled.store(true, Ordering::SeqCst);
        self.signal.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.signal.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Fails with `Cancelled` or `DeadlineExceeded` once the context is done.
    pub fn check(&self) -> BackendResult<()> {
        if self.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(BackendError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
