use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::LoyaltyDatabase,
    db_types::{Operation, OrderNumber, Points},
    helpers::is_valid_order_number,
    BalanceLedger,
    LoyaltyError,
};

/// `WithdrawalApi` lets customers spend points against an order number of their choosing.
pub struct WithdrawalApi<B> {
    ledger: BalanceLedger<B>,
}

impl<B: Debug> Debug for WithdrawalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi ({:?})", self.ledger)
    }
}

impl<B> WithdrawalApi<B>
where B: LoyaltyDatabase
{
    pub fn new(db: B) -> Self {
        Self { ledger: BalanceLedger::new(db) }
    }

    /// Debits `amount` from the user's account. The order number must pass the checksum, but does not have to
    /// belong to a registered order.
    pub async fn withdraw(&self, user_id: i64, order_number: &str, amount: Points) -> Result<Operation, LoyaltyError> {
        if user_id <= 0 {
            return Err(LoyaltyError::BadParam(format!("Invalid user id: {user_id}")));
        }
        if !is_valid_order_number(order_number) {
            return Err(LoyaltyError::BadOrderNumber(order_number.to_string()));
        }
        trace!("💸️ User #{user_id} is withdrawing {amount} against order [{order_number}]");
        self.ledger.apply_debit(user_id, OrderNumber::from(order_number), amount).await
    }
}
