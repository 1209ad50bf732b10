use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db::traits::{LedgerRepository, OrderStore},
    db_types::{Account, OperationType, Operation, Order, OrderNumber, OrderStatusType, UserOrder},
};

/// A transaction handle that exposes both repositories. All writes made through one handle commit or roll back
/// together.
#[allow(async_fn_in_trait)]
pub trait UnitOfWork: OrderStore + LedgerRepository + Send {
    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// This trait defines the highest level of behaviour for backends supporting the Loyalty Engine.
///
/// This behaviour includes:
/// * Handing out units of work for mutations
/// * Read-only queries on orders, accounts and the operations ledger
///
/// Read-only queries take no locks, and always see the latest committed state.
#[allow(async_fn_in_trait)]
pub trait LoyaltyDatabase: Clone {
    type Tx: UnitOfWork;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Starts a new unit of work.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError>;

    /// Fetches at most `limit` orders whose status is one of `statuses`. Orders that were never polled come first,
    /// then the least recently polled.
    async fn fetch_orders_by_statuses(
        &self,
        statuses: &[OrderStatusType],
        limit: u32,
    ) -> Result<Vec<Order>, StoreError>;

    /// Records that the orders were polled at `polled_at`, which moves them to the back of the pending queue. Takes no
    /// lock beyond the single statement.
    async fn mark_orders_polled(&self, order_ids: &[i64], polled_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Fetches all the orders submitted by the user, oldest first, along with the points credited for each.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<UserOrder>, StoreError>;

    async fn fetch_account_for_user(&self, user_id: i64) -> Result<Option<Account>, StoreError>;

    /// Fetches the ledger for the user's account, oldest first. If `operation_type` is given, only operations of that
    /// type are returned.
    async fn fetch_operations_for_user(
        &self,
        user_id: i64,
        operation_type: Option<OperationType>,
    ) -> Result<Vec<Operation>, StoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("Could not migrate the database schema. {0}")]
    MigrationError(String),
    #[error("A record that should exist was not found. {0}")]
    MissingRecord(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationError(e.to_string())
    }
}
