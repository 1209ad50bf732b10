//! Loyalty Engine
//!
//! The Loyalty Engine keeps the books for a loyalty points service. Customers register order numbers, an external
//! accrual authority decides (asynchronously) how many points each order is worth, and the engine credits or debits
//! the customer's account accordingly.
//!
//! The library is divided into these main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`mod@engine_api`]). This provides order submission, withdrawals, balance queries and the
//!    order reconciler that moves orders through their status lifecycle and credits accounts exactly once.
//! 3. Accrual reconciliation ([`mod@accrual`] and [`mod@reconciliation`]). The [`ReconciliationScheduler`] polls the
//!    accrual authority for every order that has not reached a final status yet.
//!
//! The engine also emits events that can be subscribed to. For example, when an order's points are credited, an
//! `OrderCreditedEvent` is published. See [`mod@events`].
//!
//! ## Lock ordering
//! Every mutation of an order or an account happens inside one unit of work that first takes an exclusive lock on the
//! row it reads. When both are needed, the order is always locked before the account, and no unit of work ever holds
//! two accounts.
mod db;

pub mod accrual;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod reconciliation;

mod engine_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteUnitOfWork};
pub use db::traits::{InsertOrderResult, LedgerRepository, LoyaltyDatabase, OrderStore, StoreError, UnitOfWork};
pub use engine_api::{
    accounts_api::AccountApi,
    balance_ledger::BalanceLedger,
    errors::LoyaltyError,
    order_api::OrderApi,
    order_reconciler::{OrderReconciler, ReconcileOutcome},
    withdrawal_api::WithdrawalApi,
};
pub use reconciliation::{ReconciliationScheduler, SchedulerConfig, TickSummary};
