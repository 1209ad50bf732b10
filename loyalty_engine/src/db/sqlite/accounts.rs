use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::traits::StoreError,
    db_types::{Account, Points},
};

const ACCOUNT_COLUMNS: &str = "id, user_id, balance, total_credited, total_debited";

/// Creates a zero-balance account for the user, unless one already exists.
pub async fn create_account(user_id: i64, conn: &mut SqliteConnection) -> Result<(Account, bool), StoreError> {
    let created = sqlx::query_as::<_, Account>(&format!(
        r#"
            INSERT INTO accounts (user_id, balance, total_credited, total_debited)
            VALUES ($1, 0, 0, 0)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    match created {
        Some(account) => {
            debug!("🗃️ Account #{} created for user #{user_id}", account.id);
            Ok((account, true))
        },
        None => {
            let account = account_for_user(user_id, conn)
                .await?
                .ok_or_else(|| StoreError::MissingRecord(format!("Account for user #{user_id}")))?;
            Ok((account, false))
        },
    }
}

pub async fn account_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Account>, StoreError> {
    let account = sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

/// Locks the user's account for the rest of the transaction. The no-op update is what takes the lock.
pub async fn lock_account_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Account>, StoreError> {
    let account = sqlx::query_as::<_, Account>(&format!(
        "UPDATE accounts SET balance = balance WHERE user_id = $1 RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Lock on account for user #{user_id}: {}", if account.is_some() { "acquired" } else { "no account" });
    Ok(account)
}

pub async fn update_balances(account: &Account, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE accounts SET balance = $1, total_credited = $2, total_debited = $3 WHERE id = $4",
    )
    .bind(account.balance)
    .bind(account.total_credited)
    .bind(account.total_debited)
    .bind(account.id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::MissingRecord(format!("Account #{}", account.id)));
    }
    trace!(
        "🗃️ Account #{} balance is now {} (credited {}, debited {})",
        account.id,
        account.balance,
        account.total_credited,
        account.total_debited
    );
    Ok(())
}

/// Sums the ledger for an account. Used to audit the stored balance against its operations.
pub async fn ledger_balance(account_id: i64, conn: &mut SqliteConnection) -> Result<Points, StoreError> {
    let total: i64 = sqlx::query_scalar(
        r#"
            SELECT COALESCE(SUM(CASE operation_type WHEN 'CREDIT' THEN amount ELSE -amount END), 0)
            FROM operations
            WHERE account_id = $1
        "#,
    )
    .bind(account_id)
    .fetch_one(conn)
    .await?;
    Ok(Points::from(total))
}
