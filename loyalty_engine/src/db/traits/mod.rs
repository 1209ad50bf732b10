//! #  Database management and control.
//!
//! This module provides the interfaces that define the contracts of the loyalty engine database *backends*.
//!
//! ## Units of work
//! Every mutation happens inside a unit of work, obtained from [`LoyaltyDatabase::begin`]. A unit of work is an
//! explicit transaction handle: the repository methods that must share a transaction are called on the same handle,
//! and nothing is written until [`UnitOfWork::commit`] succeeds. Dropping a unit of work without committing it rolls
//! back every write made through it.
//!
//! ## Traits
//! * [`LoyaltyDatabase`] is the backend handle. It hands out units of work and answers read-only queries.
//! * [`OrderStore`] persists orders, and provides the exclusive lock-and-read on an order.
//! * [`LedgerRepository`] persists accounts and their operations, and provides the exclusive lock-and-read on an
//!   account.
//! * [`UnitOfWork`] ties the two repositories to one transaction.
mod data_objects;
mod ledger_repository;
mod loyalty_database;
mod order_store;

pub use data_objects::InsertOrderResult;
pub use ledger_repository::LedgerRepository;
pub use loyalty_database::{LoyaltyDatabase, StoreError, UnitOfWork};
pub use order_store::OrderStore;
