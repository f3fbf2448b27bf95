//! Transaction ledger
//!
//! Records, balance derivation, the approval state machine and listing.
//! Nothing in here touches storage.

pub mod approval;
pub mod balance;
pub mod query;
pub mod transaction;

pub use balance::{
    breakdown, is_effective, is_within_limit, recompute, round_cents, BalanceBreakdown, MAX_AMOUNT,
};
pub use query::{TransactionFilter, TransactionSort};
pub use transaction::{Metadata, Transaction, TransactionStatus, TransactionType};
