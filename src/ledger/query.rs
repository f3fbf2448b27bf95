//! Transaction listing: optional type/status filter plus a sort order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::transaction::{Transaction, TransactionStatus, TransactionType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.kind.map_or(true, |k| tx.kind == k) && self.status.map_or(true, |s| tx.status == s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionSort {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

impl TransactionSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "date-desc" | "newest" => Some(TransactionSort::DateDesc),
            "date-asc" | "oldest" => Some(TransactionSort::DateAsc),
            "amount-desc" => Some(TransactionSort::AmountDesc),
            "amount-asc" => Some(TransactionSort::AmountAsc),
            _ => None,
        }
    }

    fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        // Amounts sort by magnitude: an approved withdrawal is stored negative.
        let by_amount = |a: &Transaction, b: &Transaction| {
            a.amount
                .abs()
                .partial_cmp(&b.amount.abs())
                .unwrap_or(Ordering::Equal)
        };
        match self {
            TransactionSort::DateDesc => b.created_at.cmp(&a.created_at),
            TransactionSort::DateAsc => a.created_at.cmp(&b.created_at),
            TransactionSort::AmountDesc => by_amount(b, a),
            TransactionSort::AmountAsc => by_amount(a, b),
        }
    }
}

/// Filtered, sorted copy. Ties keep ledger order (stable sort).
pub fn list(
    transactions: &[Transaction],
    filter: &TransactionFilter,
    sort: TransactionSort,
) -> Vec<Transaction> {
    let mut out: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| filter.matches(tx))
        .cloned()
        .collect();
    out.sort_by(|a, b| sort.compare(a, b));
    out
}
