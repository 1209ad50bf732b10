use crate::{
    db_types::{Account, NewOperation, Operation},
    db::traits::StoreError,
};

/// Account and operation persistence, scoped to a unit of work.
#[allow(async_fn_in_trait)]
pub trait LedgerRepository {
    /// Creates a zero-balance account for the user if one does not exist yet. Returns the account, and whether it
    /// was created by this call.
    async fn create_account(&mut self, user_id: i64) -> Result<(Account, bool), StoreError>;

    /// Takes an exclusive lock on the user's account and returns its current state. The lock is held until the unit
    /// of work is committed or rolled back. Returns `None` if the user has no account.
    async fn lock_account_by_user(&mut self, user_id: i64) -> Result<Option<Account>, StoreError>;

    /// Writes the balance and running totals of the account.
    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Appends an operation to the ledger. Operations are never updated or deleted.
    async fn append_operation(&mut self, operation: NewOperation) -> Result<Operation, StoreError>;
}
