//! # Loyalty engine public API
//!
//! The API is modular, so that clients can pick the functionality they need:
//!
//! * [`order_api`] registers order numbers on behalf of customers and lists their orders.
//! * [`order_reconciler`] applies the accrual authority's decisions to orders, crediting accounts exactly once.
//! * [`withdrawal_api`] lets customers spend their points.
//! * [`accounts_api`] opens accounts and answers balance and history queries.
//! * [`balance_ledger`] is the only place account balances change.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements [`crate::LoyaltyDatabase`]:
//!
//! ```rust,ignore
//! use loyalty_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = AccountApi::new(db);
//! let balance = api.get_balance(user_id).await?;
//! ```
pub mod accounts_api;
pub mod balance_ledger;
pub mod errors;
pub mod order_api;
pub mod order_reconciler;
pub mod withdrawal_api;
