//! Balance recomputation
//!
//! The stored user balance is only a cache of [`recompute`]. It is
//! overwritten from scratch after every insertion or status change and is
//! never patched incrementally.

use serde::{Deserialize, Serialize};

use super::transaction::{Transaction, TransactionStatus, TransactionType};

/// Largest absolute amount a single request may carry: a transaction
/// amount, a trade P&L or an adjustment target.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// Finite and no larger than [`MAX_AMOUNT`] in absolute value.
pub fn is_within_limit(amount: f64) -> bool {
    amount.is_finite() && amount.abs() <= MAX_AMOUNT
}

/// Round a USD amount to cents, half away from zero.
pub fn round_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Collapse -0.0 so serialized balances never read "-0.0".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Per-category sums behind a balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceBreakdown {
    pub deposits: f64,
    pub withdrawals: f64,
    pub adjustments: f64,
    pub trade_pnl: f64,
}

impl BalanceBreakdown {
    pub fn total(&self) -> f64 {
        round_cents(self.deposits + self.withdrawals + self.adjustments + self.trade_pnl)
    }
}

/// Whether a transaction currently contributes to the balance.
pub fn is_effective(tx: &Transaction) -> bool {
    match tx.kind {
        TransactionType::Deposit => tx.status == TransactionStatus::Approved,
        TransactionType::Withdraw => matches!(
            tx.status,
            TransactionStatus::Processing | TransactionStatus::Completed
        ),
        TransactionType::Adjustment | TransactionType::TradePnl => true,
    }
}

/// Sum effective amounts per category. Approved withdrawals are already
/// stored negative, so no sign flip happens here.
///
/// Each category is summed in integer cents, so the result does not depend
/// on the order of `transactions`. Nothing is clamped: a category whose
/// cents no longer fit falls back to a floating-point sum.
pub fn breakdown(transactions: &[Transaction]) -> BalanceBreakdown {
    let mut deposits = CentSum::default();
    let mut withdrawals = CentSum::default();
    let mut adjustments = CentSum::default();
    let mut trade_pnl = CentSum::default();

    for tx in transactions.iter().filter(|tx| is_effective(tx)) {
        let bucket = match tx.kind {
            TransactionType::Deposit => &mut deposits,
            TransactionType::Withdraw => &mut withdrawals,
            TransactionType::Adjustment => &mut adjustments,
            TransactionType::TradePnl => &mut trade_pnl,
        };
        bucket.add(tx.amount);
    }

    BalanceBreakdown {
        deposits: deposits.total(),
        withdrawals: withdrawals.total(),
        adjustments: adjustments.total(),
        trade_pnl: trade_pnl.total(),
    }
}

pub fn recompute(transactions: &[Transaction]) -> f64 {
    breakdown(transactions).total()
}

/// Running sum in exact cents, with a float shadow for overflow.
#[derive(Default)]
struct CentSum {
    cents: i128,
    overflowed: bool,
    float: f64,
}

impl CentSum {
    fn add(&mut self, amount: f64) {
        self.float += amount;
        if self.overflowed {
            return;
        }
        match to_cents(amount).and_then(|c| self.cents.checked_add(c)) {
            Some(sum) => self.cents = sum,
            None => self.overflowed = true,
        }
    }

    fn total(&self) -> f64 {
        if self.overflowed {
            round_cents(self.float)
        } else {
            from_cents(self.cents)
        }
    }
}

/// Bound well inside `i128` so the cast below is exact in range.
const CENTS_LIMIT: f64 = 1e36;

fn to_cents(amount: f64) -> Option<i128> {
    let cents = (amount * 100.0).round();
    (cents.is_finite() && cents.abs() < CENTS_LIMIT).then(|| cents as i128)
}

fn from_cents(cents: i128) -> f64 {
    round_cents(cents as f64 / 100.0)
}
