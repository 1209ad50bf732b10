use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use lpg_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::LoyaltyError;

//--------------------------------------      OrderNumber      -------------------------------------------------------
/// The externally assigned order identifier submitted by customers. Globally unique across all users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been submitted, but the accrual authority has not said anything about it yet.
    New,
    /// The accrual authority has registered the order, but has not started calculating the accrual.
    Registered,
    /// The accrual authority is calculating the accrual for the order.
    Processing,
    /// Final. The accrual has been calculated and credited to the owner's account.
    Processed,
    /// Final. The accrual authority rejected the order. No points are awarded.
    Invalid,
}

/// The statuses of orders that still need to be reconciled with the accrual authority.
pub const PENDING_ORDER_STATUSES: [OrderStatusType; 3] =
    [OrderStatusType::New, OrderStatusType::Registered, OrderStatusType::Processing];

impl OrderStatusType {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Registered => write!(f, "REGISTERED"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to NEW");
            OrderStatusType::New
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub number: OrderNumber,
    pub status: OrderStatusType,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The user that submitted (and owns) the order
    pub user_id: i64,
    /// The order number as supplied by the user
    pub number: OrderNumber,
    /// The time the order was submitted
    pub uploaded_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(user_id: i64, number: OrderNumber) -> Self {
        Self { user_id, number, uploaded_at: Utc::now() }
    }
}

//--------------------------------------       UserOrder       ---------------------------------------------------------
/// An order, along with the points that were credited for it, if any.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserOrder {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub accrual: Option<Points>,
}

//--------------------------------------        Account        ---------------------------------------------------------
/// The ledger head for a user. `balance` always equals `total_credited - total_debited`, and is never negative.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub balance: Points,
    pub total_credited: Points,
    pub total_debited: Points,
}

impl Account {
    pub fn can_cover(&self, amount: Points) -> bool {
        self.balance >= amount
    }

    /// Records a credit. Fails, leaving the account untouched, if the lifetime total would overflow.
    pub fn credit(&mut self, amount: Points) -> Result<(), LoyaltyError> {
        let total_credited = self.total_credited.checked_add(amount).ok_or_else(|| {
            LoyaltyError::BadParam(format!("Crediting {amount} would overflow account #{}", self.id))
        })?;
        self.total_credited = total_credited;
        self.balance = self.total_credited - self.total_debited;
        Ok(())
    }

    /// Records a debit. The caller must have checked [`Account::can_cover`] first.
    pub fn debit(&mut self, amount: Points) -> Result<(), LoyaltyError> {
        let total_debited = self.total_debited.checked_add(amount).ok_or_else(|| {
            LoyaltyError::BadParam(format!("Debiting {amount} would overflow account #{}", self.id))
        })?;
        self.total_debited = total_debited;
        self.balance = self.total_credited - self.total_debited;
        Ok(())
    }

    pub fn is_consistent(&self) -> bool {
        self.balance == self.total_credited - self.total_debited && !self.balance.is_negative()
    }
}

//--------------------------------------     OperationType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    Credit,
    Debit,
}

impl Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Credit => write!(f, "CREDIT"),
            OperationType::Debit => write!(f, "DEBIT"),
        }
    }
}

//--------------------------------------       Operation       ---------------------------------------------------------
/// An immutable ledger entry. The operations of an account fully explain its balance.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Operation {
    pub id: i64,
    pub account_id: i64,
    /// Set for credits. Debits reference an order number only, which need not exist in the orders table.
    pub order_id: Option<i64>,
    pub order_number: OrderNumber,
    pub operation_type: OperationType,
    pub amount: Points,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOperation {
    pub account_id: i64,
    pub order_id: Option<i64>,
    pub order_number: OrderNumber,
    pub operation_type: OperationType,
    pub amount: Points,
    pub processed_at: DateTime<Utc>,
}

impl NewOperation {
    pub fn credit(account: &Account, order: &Order, amount: Points, processed_at: DateTime<Utc>) -> Self {
        Self {
            account_id: account.id,
            order_id: Some(order.id),
            order_number: order.number.clone(),
            operation_type: OperationType::Credit,
            amount,
            processed_at,
        }
    }

    pub fn debit(account: &Account, order_number: OrderNumber, amount: Points, processed_at: DateTime<Utc>) -> Self {
        Self {
            account_id: account.id,
            order_id: None,
            order_number,
            operation_type: OperationType::Debit,
            amount,
            processed_at,
        }
    }
}

//--------------------------------------        Balance        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Points available to spend
    pub current: Points,
    /// Lifetime total of points withdrawn
    pub withdrawn: Points,
}

impl From<&Account> for Balance {
    fn from(account: &Account) -> Self {
        Self { current: account.balance, withdrawn: account.total_debited }
    }
}

//--------------------------------------       Withdrawal      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Withdrawal {
    pub order_number: OrderNumber,
    pub amount: Points,
    pub processed_at: DateTime<Utc>,
}

impl From<Operation> for Withdrawal {
    fn from(op: Operation) -> Self {
        Self { order_number: op.order_number, amount: op.amount, processed_at: op.processed_at }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn account(balance: i64) -> Account {
        Account {
            id: 1,
            user_id: 7,
            balance: Points::from(balance),
            total_credited: Points::from(balance),
            total_debited: Points::default(),
        }
    }

    #[test]
    fn order_status_round_trip() {
        for status in [
            OrderStatusType::New,
            OrderStatusType::Registered,
            OrderStatusType::Processing,
            OrderStatusType::Processed,
            OrderStatusType::Invalid,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("processed".parse::<OrderStatusType>().is_err());
        assert_eq!(OrderStatusType::from("BOGUS".to_string()), OrderStatusType::New);
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatusType::Processed.is_terminal());
        assert!(OrderStatusType::Invalid.is_terminal());
        assert!(PENDING_ORDER_STATUSES.iter().all(|s| !s.is_terminal()));
    }

    #[test]
    fn account_arithmetic_keeps_balance_consistent() {
        let mut acc = account(100);
        assert!(acc.can_cover(Points::from(100)));
        assert!(!acc.can_cover(Points::from(101)));
        acc.debit(Points::from(60)).unwrap();
        assert_eq!(acc.balance, Points::from(40));
        assert_eq!(acc.total_debited, Points::from(60));
        acc.credit(Points::from(15)).unwrap();
        assert_eq!(acc.balance, Points::from(55));
        assert_eq!(acc.total_credited, Points::from(115));
        assert!(acc.is_consistent());
    }

    #[test]
    fn credits_that_would_overflow_are_refused() {
        let mut acc = account(i64::MAX);
        let err = acc.credit(Points::from(1)).unwrap_err();
        assert!(matches!(err, LoyaltyError::BadParam(_)));
        assert_eq!(acc.balance, Points::from(i64::MAX));
        assert_eq!(acc.total_credited, Points::from(i64::MAX));
        assert!(acc.is_consistent());
    }

    #[test]
    fn balance_reports_total_debited_as_withdrawn() {
        let mut acc = account(80);
        acc.debit(Points::from(30)).unwrap();
        let balance = Balance::from(&acc);
        assert_eq!(balance.current, Points::from(50));
        assert_eq!(balance.withdrawn, Points::from(30));
    }
}
