use thiserror::Error;

use crate::{
    db::traits::StoreError,
    db_types::{OrderNumber, Points},
};

/// Every failure the engine API reports.
#[derive(Debug, Clone, Error)]
pub enum LoyaltyError {
    #[error("Invalid parameter. {0}")]
    BadParam(String),
    #[error("{0} is not a valid order number")]
    BadOrderNumber(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Order {0} has already been registered by this user")]
    OrderAlreadyRegistered(OrderNumber),
    #[error("Order {0} has already been registered by another user")]
    OrderRegisteredByAnotherUser(OrderNumber),
    #[error("Insufficient funds. The balance is {balance}, but {requested} was requested")]
    InsufficientFunds { balance: Points, requested: Points },
    #[error("Order {order} cannot be moved to status {status}")]
    UnexpectedStatus { order: OrderNumber, status: String },
    #[error("A temporary failure occurred. The request can be retried. {0}")]
    Transient(String),
}

impl LoyaltyError {
    /// Transient errors are the only ones worth retrying as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, LoyaltyError::Transient(_))
    }
}

impl From<StoreError> for LoyaltyError {
    fn from(e: StoreError) -> Self {
        LoyaltyError::Transient(e.to_string())
    }
}
