//! The engine's view of the external accrual authority.
//!
//! The authority decides, asynchronously, what an order is worth. The engine only ever asks; the transport (HTTP in
//! the server) lives behind the [`AccrualClient`] trait.
use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{OrderNumber, OrderStatusType, Points};

/// The status of an order as reported by the accrual authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccrualStatus {
    Registered,
    Invalid,
    Processing,
    Processed,
    /// Anything the authority sends that is not one of the statuses above
    Unrecognised(String),
}

impl AccrualStatus {
    /// The order status this decision maps to. Returns `None` for statuses the engine cannot act on.
    pub fn order_status(&self) -> Option<OrderStatusType> {
        match self {
            AccrualStatus::Registered => Some(OrderStatusType::Registered),
            AccrualStatus::Invalid => Some(OrderStatusType::Invalid),
            AccrualStatus::Processing => Some(OrderStatusType::Processing),
            AccrualStatus::Processed => Some(OrderStatusType::Processed),
            AccrualStatus::Unrecognised(_) => None,
        }
    }
}

impl From<String> for AccrualStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "REGISTERED" => Self::Registered,
            "INVALID" => Self::Invalid,
            "PROCESSING" => Self::Processing,
            "PROCESSED" => Self::Processed,
            _ => Self::Unrecognised(value),
        }
    }
}

impl From<AccrualStatus> for String {
    fn from(value: AccrualStatus) -> Self {
        value.to_string()
    }
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualStatus::Registered => write!(f, "REGISTERED"),
            AccrualStatus::Invalid => write!(f, "INVALID"),
            AccrualStatus::Processing => write!(f, "PROCESSING"),
            AccrualStatus::Processed => write!(f, "PROCESSED"),
            AccrualStatus::Unrecognised(s) => write!(f, "{s}"),
        }
    }
}

/// The authority's decision on a single order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accrual {
    pub order: OrderNumber,
    pub status: AccrualStatus,
    /// Only meaningful when the status is `Processed`
    pub amount: Option<Points>,
}

#[derive(Debug, Clone, Error)]
pub enum AccrualClientError {
    #[error("Order {0} is not registered with the accrual system")]
    NotRegistered(OrderNumber),
    #[error("The accrual system is rate limiting us. Retry after {}s", retry_after.as_secs())]
    TooManyRequests { retry_after: Duration },
    #[error("The accrual system is unavailable. {0}")]
    Unavailable(String),
}

/// Queries the accrual authority about one order.
#[allow(async_fn_in_trait)]
pub trait AccrualClient {
    async fn get_accrual(&self, order: &OrderNumber) -> Result<Accrual, AccrualClientError>;
}
