//! # Loyalty points gateway server
//!
//! This crate hosts the long-running process of the loyalty points gateway. It is responsible for:
//! * Loading the configuration from the environment.
//! * Preparing the database (optionally wiping it first) and running migrations.
//! * Polling the external accrual system for pending orders, and applying its decisions through the
//!   [`loyalty_engine`] reconciler.
//! * Shutting everything down cleanly on Ctrl-C.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod accrual_client;
pub mod accrual_worker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod server;
