use chrono::{DateTime, Utc};

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType},
    db::traits::{InsertOrderResult, StoreError},
};

/// Order persistence, scoped to a unit of work.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// Inserts the order with status `New`, unless an order with the same number already exists. The number is unique
    /// across all users, so the existing order is returned as-is, whoever owns it.
    async fn insert_order(&mut self, order: NewOrder) -> Result<InsertOrderResult, StoreError>;

    /// Takes an exclusive lock on the order with the given number, and returns its current state. The lock is held
    /// until the unit of work is committed or rolled back. Returns `None` if there is no such order.
    async fn lock_order_by_number(&mut self, number: &OrderNumber) -> Result<Option<Order>, StoreError>;

    /// Sets the status and `updated_at` timestamp of an order, returning the updated record.
    async fn update_order_status(
        &mut self,
        order_id: i64,
        status: OrderStatusType,
        updated_at: DateTime<Utc>,
    ) -> Result<Order, StoreError>;
}
