//! Transaction records
//!
//! One canonical `status` per record plus one opaque metadata map. The
//! ledger never reads metadata when computing balances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::balance::round_cents;

/// Free-form annotations (address, tx hash, trade reference, admin reason).
pub type Metadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    TradePnl,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdraw => "WITHDRAW",
            TransactionType::TradePnl => "TRADE_PNL",
            TransactionType::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAW" => Some(TransactionType::Withdraw),
            "TRADE_PNL" => Some(TransactionType::TradePnl),
            "ADJUSTMENT" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }

    /// Deposits and withdrawals wait for a human decision; the rest are
    /// effective from creation.
    pub fn requires_approval(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::Withdraw)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    UnderReview,
    Approved,
    Processing,
    Completed,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::UnderReview => "UNDER_REVIEW",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Processing => "PROCESSING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "UNDER_REVIEW" => Some(TransactionStatus::UnderReview),
            "APPROVED" => Some(TransactionStatus::Approved),
            "PROCESSING" => Some(TransactionStatus::Processing),
            "COMPLETED" => Some(TransactionStatus::Completed),
            "REJECTED" => Some(TransactionStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Signed USD amount in cents precision. WITHDRAW amounts are positive
    /// while under review and negative once approved.
    pub amount: f64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Transaction {
    fn new(
        id: String,
        kind: TransactionType,
        amount: f64,
        status: TransactionStatus,
        now: DateTime<Utc>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id,
            kind,
            amount: round_cents(amount),
            status,
            created_at: now,
            approved_at: None,
            completed_at: None,
            rejected_at: None,
            metadata,
        }
    }

    /// Deposit awaiting review. `amount` must already be validated positive.
    pub fn deposit(amount: f64, now: DateTime<Utc>, metadata: Metadata) -> Self {
        Self::new(
            generate_id("dep"),
            TransactionType::Deposit,
            amount,
            TransactionStatus::UnderReview,
            now,
            metadata,
        )
    }

    /// Withdrawal awaiting review, stored positive until approved.
    pub fn withdraw(amount: f64, now: DateTime<Utc>, metadata: Metadata) -> Self {
        Self::new(
            generate_id("wd"),
            TransactionType::Withdraw,
            amount,
            TransactionStatus::UnderReview,
            now,
            metadata,
        )
    }

    pub fn adjustment(amount: f64, now: DateTime<Utc>, metadata: Metadata) -> Self {
        let mut tx = Self::new(
            generate_id("adj"),
            TransactionType::Adjustment,
            amount,
            TransactionStatus::Approved,
            now,
            metadata,
        );
        tx.approved_at = Some(now);
        tx
    }

    pub fn trade_pnl(trade_id: &str, amount: f64, now: DateTime<Utc>, metadata: Metadata) -> Self {
        let mut tx = Self::new(
            format!("trade_{trade_id}"),
            TransactionType::TradePnl,
            amount,
            TransactionStatus::Approved,
            now,
            metadata,
        );
        tx.approved_at = Some(now);
        tx
    }
}

fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}
