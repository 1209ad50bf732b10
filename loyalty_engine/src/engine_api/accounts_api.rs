//! Account management and queries.
use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{LedgerRepository, LoyaltyDatabase, UnitOfWork},
    db_types::{Account, Balance, Operation, OperationType, Withdrawal},
    LoyaltyError,
};

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: LoyaltyDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Opens a zero-balance account for the user. Opening an account that exists returns it unchanged.
    pub async fn open_account(&self, user_id: i64) -> Result<Account, LoyaltyError> {
        if user_id <= 0 {
            return Err(LoyaltyError::BadParam(format!("Invalid user id: {user_id}")));
        }
        let mut tx = self.db.begin().await?;
        let (account, created) = tx.create_account(user_id).await?;
        tx.commit().await?;
        if created {
            info!("💸️ Opened account #{} for user #{user_id}", account.id);
        }
        Ok(account)
    }

    pub async fn get_balance(&self, user_id: i64) -> Result<Balance, LoyaltyError> {
        let account = self
            .db
            .fetch_account_for_user(user_id)
            .await?
            .ok_or_else(|| LoyaltyError::NotFound(format!("Account for user #{user_id}")))?;
        Ok(Balance::from(&account))
    }

    /// The user's withdrawals, oldest first.
    pub async fn get_withdrawal_history(&self, user_id: i64) -> Result<Vec<Withdrawal>, LoyaltyError> {
        let debits = self.db.fetch_operations_for_user(user_id, Some(OperationType::Debit)).await?;
        trace!("💸️ User #{user_id} has made {} withdrawals", debits.len());
        Ok(debits.into_iter().map(Withdrawal::from).collect())
    }

    /// Every operation on the user's account, oldest first.
    pub async fn operations_for_user(&self, user_id: i64) -> Result<Vec<Operation>, LoyaltyError> {
        Ok(self.db.fetch_operations_for_user(user_id, None).await?)
    }
}
