use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool, Transaction};

use super::{accounts, db_url, new_pool, operations, orders};
use crate::{
    db::traits::{InsertOrderResult, LedgerRepository, LoyaltyDatabase, OrderStore, StoreError, UnitOfWork},
    db_types::{
        Account,
        NewOperation,
        NewOrder,
        Operation,
        OperationType,
        Order,
        OrderNumber,
        OrderStatusType,
        Points,
        UserOrder,
    },
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `LPG_DATABASE_URL`.
    pub async fn new() -> Result<Self, StoreError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Drops the database at `url`, if it exists, and creates an empty one in its place.
    ///
    /// No pool may be open on the database while this runs.
    pub async fn reset_database(url: &str) -> Result<(), StoreError> {
        if Sqlite::database_exists(url).await? {
            Sqlite::drop_database(url).await?;
            warn!("🗃️ Dropped database {url}");
        }
        Sqlite::create_database(url).await?;
        info!("🗃️ Created empty database {url}");
        Ok(())
    }

    /// Recomputes the user's balance from the operations ledger. Returns `None` if the user has no account.
    pub async fn ledger_balance_for_user(&self, user_id: i64) -> Result<Option<Points>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        match accounts::account_for_user(user_id, &mut conn).await? {
            Some(account) => Ok(Some(accounts::ledger_balance(account.id, &mut conn).await?)),
            None => Ok(None),
        }
    }
}

impl LoyaltyDatabase for SqliteDatabase {
    type Tx = SqliteUnitOfWork;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(SqliteUnitOfWork { tx })
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_number(number, &mut conn).await
    }

    async fn fetch_orders_by_statuses(
        &self,
        statuses: &[OrderStatusType],
        limit: u32,
    ) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_by_statuses(statuses, limit, &mut conn).await
    }

    async fn mark_orders_polled(&self, order_ids: &[i64], polled_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let n = orders::mark_orders_polled(order_ids, polled_at, &mut conn).await?;
        trace!("🗃️ Marked {n} order(s) as polled");
        Ok(())
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<UserOrder>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_user(user_id, &mut conn).await
    }

    async fn fetch_account_for_user(&self, user_id: i64) -> Result<Option<Account>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        accounts::account_for_user(user_id, &mut conn).await
    }

    async fn fetch_operations_for_user(
        &self,
        user_id: i64,
        operation_type: Option<OperationType>,
    ) -> Result<Vec<Operation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        operations::operations_for_user(user_id, operation_type, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        debug!("🗃️ Connection pool to {} closed", self.url);
        Ok(())
    }
}

/// A unit of work backed by an SQLite transaction. Dropping it without calling [`UnitOfWork::commit`] rolls back.
pub struct SqliteUnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl Debug for SqliteUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteUnitOfWork")
    }
}

impl OrderStore for SqliteUnitOfWork {
    async fn insert_order(&mut self, order: NewOrder) -> Result<InsertOrderResult, StoreError> {
        orders::idempotent_insert(order, &mut self.tx).await
    }

    async fn lock_order_by_number(&mut self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        orders::lock_order_by_number(number, &mut self.tx).await
    }

    async fn update_order_status(
        &mut self,
        order_id: i64,
        status: OrderStatusType,
        updated_at: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        orders::update_order_status(order_id, status, updated_at, &mut self.tx).await
    }
}

impl LedgerRepository for SqliteUnitOfWork {
    async fn create_account(&mut self, user_id: i64) -> Result<(Account, bool), StoreError> {
        accounts::create_account(user_id, &mut self.tx).await
    }

    async fn lock_account_by_user(&mut self, user_id: i64) -> Result<Option<Account>, StoreError> {
        accounts::lock_account_for_user(user_id, &mut self.tx).await
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        accounts::update_balances(account, &mut self.tx).await
    }

    async fn append_operation(&mut self, operation: NewOperation) -> Result<Operation, StoreError> {
        operations::insert_operation(operation, &mut self.tx).await
    }
}

impl UnitOfWork for SqliteUnitOfWork {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
