use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db::traits::{LedgerRepository, LoyaltyDatabase, UnitOfWork},
    db_types::{Account, NewOperation, Operation, Order, OrderNumber, Points},
    LoyaltyError,
};

/// `BalanceLedger` is the only code that moves account balances. Every change locks the account, appends an
/// operation and saves the new totals in one unit of work.
pub struct BalanceLedger<B> {
    db: B,
}

impl<B: Debug> Debug for BalanceLedger<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BalanceLedger ({:?})", self.db)
    }
}

impl<B> BalanceLedger<B>
where B: LoyaltyDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Debits `amount` from the user's account, referencing `order_number`.
    ///
    /// The account is locked before the balance is checked, so concurrent debits on the same account are applied one
    /// after the other and can never take the balance below zero.
    pub async fn apply_debit(
        &self,
        user_id: i64,
        order_number: OrderNumber,
        amount: Points,
    ) -> Result<Operation, LoyaltyError> {
        if !amount.is_positive() {
            return Err(LoyaltyError::BadParam(format!("Withdrawal amount must be positive, but was {amount}")));
        }
        let mut tx = self.db.begin().await?;
        match debit(&mut tx, user_id, order_number, amount, Utc::now()).await {
            Ok((operation, account)) => {
                tx.commit().await?;
                info!("💸️ User #{user_id} withdrew {amount}. The balance is now {}", account.balance);
                Ok(operation)
            },
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!("💸️ Could not roll back the debit for user #{user_id}: {rb}");
                }
                Err(e)
            },
        }
    }
}

/// Debits the user's account within the caller's unit of work. Returns the new operation and the updated account.
pub(crate) async fn debit<T: LedgerRepository>(
    tx: &mut T,
    user_id: i64,
    order_number: OrderNumber,
    amount: Points,
    at: DateTime<Utc>,
) -> Result<(Operation, Account), LoyaltyError> {
    let mut account = tx
        .lock_account_by_user(user_id)
        .await?
        .ok_or_else(|| LoyaltyError::NotFound(format!("Account for user #{user_id}")))?;
    if !account.can_cover(amount) {
        debug!("💸️ User #{user_id} cannot cover {amount} with a balance of {}", account.balance);
        return Err(LoyaltyError::InsufficientFunds { balance: account.balance, requested: amount });
    }
    account.debit(amount)?;
    let operation = tx.append_operation(NewOperation::debit(&account, order_number, amount, at)).await?;
    tx.save_account(&account).await?;
    Ok((operation, account))
}

/// Credits the owner of `order` within the caller's unit of work. The caller must already hold the lock on the order.
///
/// An owner without an account gets one opened here.
pub(crate) async fn credit<T: LedgerRepository>(
    tx: &mut T,
    order: &Order,
    amount: Points,
    at: DateTime<Utc>,
) -> Result<(Operation, Account), LoyaltyError> {
    if !amount.is_positive() {
        return Err(LoyaltyError::BadParam(format!("Credit amount must be positive, but was {amount}")));
    }
    let mut account = match tx.lock_account_by_user(order.user_id).await? {
        Some(account) => account,
        None => {
            let (account, _) = tx.create_account(order.user_id).await?;
            info!("🔄️ Opened account #{} for user #{} on their first credit", account.id, order.user_id);
            account
        },
    };
    account.credit(amount)?;
    let operation = tx.append_operation(NewOperation::credit(&account, order, amount, at)).await?;
    tx.save_account(&account).await?;
    Ok((operation, account))
}
