use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use std::sync::Arc;
use uuid::Uuid;

use uow::{BackendError, BackendResult, PgHandle, TransactionAware};

use super::entities::{Order, User};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Runs queries on whatever the handle points at: the unit of work's
/// transaction, or the pool outside of one.
#[derive(Clone)]
struct Db {
    handle: PgHandle,
}

impl Db {
    async fn execute(&self, query: PgQuery<'_>) -> BackendResult<()> {
        match &self.handle {
            PgHandle::Transaction(executor) => {
                let mut tx_guard = executor.tx.lock().await;
                let tx = tx_guard.as_mut().ok_or(BackendError::Finalized)?;
                query.execute(&mut **tx).await?;
            }
            PgHandle::Pool(pool) => {
                query.execute(pool.as_ref()).await?;
            }
        }
        Ok(())
    }

    async fn fetch_optional(&self, query: PgQuery<'_>) -> BackendResult<Option<PgRow>> {
        let row = match &self.handle {
            PgHandle::Transaction(executor) => {
                let mut tx_guard = executor.tx.lock().await;
                let tx = tx_guard.as_mut().ok_or(BackendError::Finalized)?;
                query.fetch_optional(&mut **tx).await?
            }
            PgHandle::Pool(pool) => query.fetch_optional(pool.as_ref()).await?,
        };
        Ok(row)
    }

    async fn fetch_one(&self, query: PgQuery<'_>) -> BackendResult<PgRow> {
        self.fetch_optional(query)
            .await?
            .ok_or(BackendError::DatabaseError(sqlx::Error::RowNotFound))
    }
}

/// Transaction-aware User Repository
pub struct UserRepository {
    db: Db,
    // Track operations for verification in tests
    committed: Arc<RwLock<bool>>,
    rolled_back: Arc<RwLock<bool>>,
}

impl UserRepository {
    pub fn new(handle: PgHandle) -> Arc<Self> {
        Arc::new(Self {
            db: Db { handle },
            committed: Arc::new(RwLock::new(false)),
            rolled_back: Arc::new(RwLock::new(false)),
        })
    }

    pub async fn create(&self, user: &User) -> BackendResult<()> {
        self.db
            .execute(
                sqlx::query("INSERT INTO users (id, username, email) VALUES ($1, $2, $3)")
                    .bind(user.id)
                    .bind(&user.username)
                    .bind(&user.email),
            )
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> BackendResult<Option<User>> {
        let row = self
            .db
            .fetch_optional(sqlx::query("SELECT id, username, email FROM users WHERE id = $1").bind(id))
            .await?;

        Ok(row.map(|r| User {
            id: r.get("id"),
            username: r.get("username"),
            email: r.get("email"),
        }))
    }

    pub async fn count(&self) -> BackendResult<i64> {
        let row = self
            .db
            .fetch_one(sqlx::query("SELECT COUNT(*) as count FROM users"))
            .await?;
        Ok(row.get("count"))
    }

    pub fn is_committed(&self) -> bool {
        *self.committed.read()
    }

    pub fn is_rolled_back(&self) -> bool {
        *self.rolled_back.read()
    }
}

#[async_trait]
impl TransactionAware for UserRepository {
    async fn on_commit(&self) -> BackendResult<()> {
        *self.committed.write() = true;
        Ok(())
    }

    async fn on_rollback(&self) -> BackendResult<()> {
        *self.rolled_back.write() = true;
        Ok(())
    }
}

/// Transaction-aware Order Repository
pub struct OrderRepository {
    db: Db,
    committed: Arc<RwLock<bool>>,
    rolled_back: Arc<RwLock<bool>>,
}

impl OrderRepository {
    pub fn new(handle: PgHandle) -> Arc<Self> {
        Arc::new(Self {
            db: Db { handle },
            committed: Arc::new(RwLock::new(false)),
            rolled_back: Arc::new(RwLock::new(false)),
        })
    }

    pub async fn create(&self, order: &Order) -> BackendResult<()> {
        self.db
            .execute(
                sqlx::query(
                    "INSERT INTO orders (id, user_id, product_name, amount) VALUES ($1, $2, $3, $4)",
                )
                .bind(order.id)
                .bind(order.user_id)
                .bind(&order.product_name)
                .bind(order.amount),
            )
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> BackendResult<Option<Order>> {
        let row = self
            .db
            .fetch_optional(
                sqlx::query("SELECT id, user_id, product_name, amount FROM orders WHERE id = $1")
                    .bind(id),
            )
            .await?;

        Ok(row.map(|r| Order {
            id: r.get("id"),
            user_id: r.get("user_id"),
            product_name: r.get("product_name"),
            amount: r.get("amount"),
        }))
    }

    pub async fn count(&self) -> BackendResult<i64> {
        let row = self
            .db
            .fetch_one(sqlx::query("SELECT COUNT(*) as count FROM orders"))
            .await?;
        Ok(row.get("count"))
    }

    pub fn is_committed(&self) -> bool {
        *self.committed.read()
    }

    pub fn is_rolled_back(&self) -> bool {
        *self.rolled_back.read()
    }
}

#[async_trait]
impl TransactionAware for OrderRepository {
    async fn on_commit(&self) -> BackendResult<()> {
        *self.committed.write() = true;
        Ok(())
    }

    async fn on_rollback(&self) -> BackendResult<()> {
        *self.rolled_back.write() = true;
        Ok(())
    }
}
