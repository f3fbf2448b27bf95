//! Tradex Backend Library
//!
//! Simulated-trading ledger: per-user balances derived from an append-only
//! transaction log, an approval workflow for deposits and withdrawals, a
//! fixed-window rate limiter and trade settlement, all over an
//! asynchronous key-value store.

pub mod accounts;
pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod middleware;
pub mod service;
pub mod store;
pub mod trading;

pub use error::{ErrorKind, LedgerError, Result};
pub use service::LedgerService;
