//! Simulated trading: order validation, tick simulation and settlement
//! into the ledger.

pub mod models;
pub mod settlement;
pub mod simulator;

pub use models::{Side, Symbol, TradeOrder, TradeRecord, TradeRequest};
pub use settlement::{settle, TradeOutcome};
pub use simulator::PriceSimulator;
