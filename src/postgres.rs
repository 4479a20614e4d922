use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{
    BackendResult, Context, Executor, PostgresConfig, TransactionAware, TransactionEvent,
    TransactionObservers, TransactionalBackend, TxContext,
};

/// Backend running each unit of work in a PostgreSQL transaction.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: Arc<PgPool>,
    config: PostgresConfig,
}

impl PostgresBackend {
    /// Create a new PostgresBackend with the given connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            config: PostgresConfig::default(),
        }
    }

    /// Create a backend whose transactions apply the settings in `config`.
    ///
    /// `config.database_url` is ignored; the pool is already connected.
    pub fn with_config(pool: Arc<PgPool>, config: PostgresConfig) -> Self {
        Self { pool, config }
    }

    /// Connect to `config.database_url` and build a backend on top of it.
    pub async fn connect(config: PostgresConfig) -> BackendResult<Self> {
        let pool = PgPool::connect(&config.database_url).await?;
        Ok(Self::with_config(Arc::new(pool), config))
    }

    pub fn pool(&self) -> &Arc<PgPool> {
        &self.pool
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }
}

/// Statement timeout for a transaction: the tighter of the configured limit
/// and the time left on the parent's deadline. A zero configured limit means
/// none, as it does in PostgreSQL.
pub(crate) fn effective_statement_timeout(
    configured: Option<Duration>,
    remaining: Option<Duration>,
) -> Option<Duration> {
    match (configured.filter(|t| !t.is_zero()), remaining) {
        (Some(configured), Some(remaining)) => Some(configured.min(remaining)),
        (configured, remaining) => configured.or(remaining),
    }
}

/// Session state for one PostgreSQL transaction.
#[derive(Debug, Clone)]
pub struct PgSession {
    executor: Executor,
    observers: TransactionObservers,
}

impl PgSession {
    fn new(executor: Executor) -> Self {
        Self {
            executor,
            observers: TransactionObservers::new(),
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Register a component that needs to be notified of transaction events.
    pub fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.register(observer);
    }

    pub fn observers(&self) -> &TransactionObservers {
        &self.observers
    }
}

/// Database handle returned by [`PostgresBackend`]'s `fetch`.
#[derive(Debug, Clone)]
pub enum PgHandle {
    /// Bound to the active transaction.
    Transaction(Executor),
    /// No transaction in scope; statements run on the pool in autocommit mode.
    Pool(Arc<PgPool>),
}

impl PgHandle {
    pub fn executor(&self) -> Option<&Executor> {
        match self {
            Self::Transaction(executor) => Some(executor),
            Self::Pool(_) => None,
        }
    }

    pub fn pool(&self) -> Option<&PgPool> {
        match self {
            Self::Pool(pool) => Some(pool.as_ref()),
            Self::Transaction(_) => None,
        }
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }
}

#[async_trait]
impl TransactionalBackend for PostgresBackend {
    type Session = PgSession;
    type Data = PgHandle;

    async fn acquire(&self, parent: &Context) -> BackendResult<TxContext<PgSession>> {
        parent.check()?;
        let mut tx = self.pool.begin().await?;

        // Settings are transaction-local so they vanish with the session.
        if let Some(search_path) = &self.config.search_path {
            sqlx::query("SELECT set_config('search_path', $1, true)")
                .bind(search_path.as_str())
                .execute(&mut *tx)
                .await?;
        }
        let timeout =
            effective_statement_timeout(self.config.statement_timeout, parent.remaining());
        if let Some(timeout) = timeout {
            let millis = timeout.as_millis().max(1).to_string();
            sqlx::query("SELECT set_config('statement_timeout', $1, true)")
                .bind(millis)
                .execute(&mut *tx)
                .await?;
        }

        debug!(context = %parent.id(), "postgres transaction started");
        Ok(TxContext::new(parent.clone(), PgSession::new(Executor::new(tx))))
    }

    fn fetch(&self, ctx: &TxContext<PgSession>) -> PgHandle {
        match ctx.session() {
            Some(session) => PgHandle::Transaction(session.executor.clone()),
            None => PgHandle::Pool(Arc::clone(&self.pool)),
        }
    }

    async fn commit(&self, ctx: TxContext<PgSession>) -> BackendResult<()> {
        let Some(session) = ctx.session() else {
            return Ok(());
        };

        // The transaction is consumed either way, releasing its connection.
        let tx = session.executor.take_transaction().await?;
        tx.commit().await?;

        // Committed; observer failures are logged by `notify` and do not
        // turn this into a failed commit.
        session.observers.notify(TransactionEvent::Commit).await;
        Ok(())
    }

    async fn rollback(&self, ctx: TxContext<PgSession>) -> BackendResult<()> {
        let Some(session) = ctx.session() else {
            return Ok(());
        };

        let tx = session.executor.take_transaction().await?;
        tx.rollback().await?;

        session.observers.notify(TransactionEvent::Rollback).await;
        Ok(())
    }
}
