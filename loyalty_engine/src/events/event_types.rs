use serde::Serialize;

use crate::db_types::{Operation, Order, Points};

/// Published once per order, after the credit for a PROCESSED order has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderCreditedEvent {
    pub order: Order,
    pub operation: Operation,
    /// The account balance immediately after the credit
    pub balance: Points,
}

impl OrderCreditedEvent {
    pub fn new(order: Order, operation: Operation, balance: Points) -> Self {
        Self { order, operation, balance }
    }
}
