//! Unit of Work Module
//!
//! This module runs caller-supplied operations inside a transaction, committing
//! when the operation succeeds and rolling back when it fails. Transaction
//! management is isolated behind the [`TransactionalBackend`] contract, with an
//! in-memory backend for tests and a PostgreSQL backend built on sqlx.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod mock;
pub mod postgres;
pub mod transaction_aware;
pub mod unit_of_work;

pub use backend::{TransactionalBackend, TxContext};
pub use config::PostgresConfig;
pub use context::Context;
pub use error::{BackendError, BackendResult, Outcome, UnitOfWorkError};
pub use executor::Executor;
pub use mock::{MockBackend, MockSession, State};
pub use postgres::{PgHandle, PgSession, PostgresBackend};
pub use transaction_aware::{TransactionAware, TransactionEvent, TransactionObservers};
pub use unit_of_work::UnitOfWork;
