//! SQLite backend for the loyalty engine.
//!
//! SQLite has no row-level locks. The backend gets the same guarantee from the database write lock: every mutating
//! unit of work starts with a write statement that returns the row it locks (`UPDATE ... SET col = col ...
//! RETURNING ...`). SQLite takes its write lock right there, before any read, so the lock-and-read is exclusive and
//! concurrent writers queue up on the busy handler instead of failing. The lock is released on commit or rollback.
mod db;

pub mod accounts;
pub mod operations;
pub mod orders;

use std::{env, str::FromStr, time::Duration};

pub use db::{SqliteDatabase, SqliteUnitOfWork};
use log::{info, trace};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use crate::db::traits::StoreError;

const SQLITE_DB_URL: &str = "sqlite://data/loyalty_store.db";
/// How long a unit of work waits for the write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("LPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ LPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    trace!("🗃️ Connecting to {url} with {max_connections} connections");
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
