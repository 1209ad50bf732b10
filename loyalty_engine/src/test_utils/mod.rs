//! Helpers for tests that need a real, throw-away database.
pub mod prepare_env;
