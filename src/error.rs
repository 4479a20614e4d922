use std::error::Error as StdError;

/// Error type for backend operations
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Transactional resource unavailable: {0}")]
    Unavailable(String),

    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),

    #[error("Transaction rollback failed: {0}")]
    RollbackFailed(String),

    #[error("Transaction already finalized")]
    Finalized,

    #[error("Context cancelled")]
    Cancelled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Terminal state reached by a single unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded and the transaction was committed.
    Committed,
    /// The operation failed and the transaction was rolled back.
    RolledBack,
    /// The operation failed and so did the rollback; data state is unknown.
    RollbackFailed,
    /// The transaction could not be started; the operation never ran.
    AcquisitionFailed,
    /// The operation succeeded but the commit failed.
    CommitFailed,
}

/// Error returned by [`UnitOfWork::execute`](crate::UnitOfWork::execute).
///
/// `E` is the operation's own error type. Whenever the operation failed, its
/// error is kept as a value (never flattened to text) and can be recovered
/// with [`operation_error`](Self::operation_error). It is also the first
/// [`std::error::Error::source`] of both the rolled-back and the
/// rollback-failure variants.
#[derive(Debug, thiserror::Error)]
pub enum UnitOfWorkError<E>
where
    E: StdError + Send + Sync + 'static,
{
    #[error("failed to start transaction: {0}")]
    Acquire(#[source] BackendError),

    #[error("{0}")]
    Operation(#[source] E),

    #[error("operation failed and rollback also failed: rollback error: {rollback}: {operation}")]
    RollbackFailed {
        #[source]
        operation: E,
        rollback: BackendError,
    },

    #[error("failed to commit transaction: {0}")]
    Commit(#[source] BackendError),
}

impl<E> UnitOfWorkError<E>
where
    E: StdError + Send + Sync + 'static,
{
    /// The terminal state this error corresponds to.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Acquire(_) => Outcome::AcquisitionFailed,
            Self::Operation(_) => Outcome::RolledBack,
            Self::RollbackFailed { .. } => Outcome::RollbackFailed,
            Self::Commit(_) => Outcome::CommitFailed,
        }
    }

    /// The operation's original error, if the operation is what failed.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) | Self::RollbackFailed { operation: err, .. } => Some(err),
            _ => None,
        }
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(err) | Self::RollbackFailed { operation: err, .. } => Some(err),
            _ => None,
        }
    }

    pub fn rollback_error(&self) -> Option<&BackendError> {
        match self {
            Self::RollbackFailed { rollback, .. } => Some(rollback),
            _ => None,
        }
    }

    /// The backend failure behind this error, if any.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::Acquire(err) | Self::Commit(err) => Some(err),
            Self::RollbackFailed { rollback, .. } => Some(rollback),
            Self::Operation(_) => None,
        }
    }
}
