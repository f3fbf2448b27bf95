//! User record as persisted under `user:<id>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::{self, Transaction};
use crate::trading::TradeRecord;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(UserStatus::Active),
            "blocked" => Some(UserStatus::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile fields supplied at registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(alias = "userId")]
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default = "default_language")]
    pub language_code: String,
    /// Cached result of [`ledger::recompute`] over `transactions`.
    pub balance: f64,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub trade_history: Vec<TradeRecord>,
    #[serde(default)]
    pub total_trades: u64,
    /// Trades with positive USD P&L, including ones dropped from history.
    #[serde(default)]
    pub winning_trades: u64,
    #[serde(default)]
    pub win_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl User {
    /// Fresh user with an empty ledger. Profile input is expected to be
    /// validated already.
    pub fn new(profile: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            username: profile.username,
            language_code: profile
                .language_code
                .unwrap_or_else(default_language),
            balance: 0.0,
            status: UserStatus::Active,
            transactions: Vec::new(),
            trade_history: Vec::new(),
            total_trades: 0,
            winning_trades: 0,
            win_rate: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }

    pub fn transaction(&self, tx_id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == tx_id)
    }

    pub fn transaction_mut(&mut self, tx_id: &str) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|tx| tx.id == tx_id)
    }

    /// Overwrite the cached balance from the ledger.
    pub fn refresh_balance(&mut self) -> f64 {
        self.balance = ledger::recompute(&self.transactions);
        self.balance
    }

    /// Append a display record, dropping the oldest beyond `cap`, and
    /// refresh the trade statistics. The statistics count every trade, not
    /// only the ones still in history.
    pub fn push_trade(&mut self, record: TradeRecord, cap: usize) {
        if record.pnl_usd > 0.0 {
            self.winning_trades = self.winning_trades.saturating_add(1);
        }
        self.trade_history.push(record);
        if self.trade_history.len() > cap {
            let excess = self.trade_history.len() - cap;
            self.trade_history.drain(..excess);
        }
        self.total_trades = self.total_trades.saturating_add(1);
        self.win_rate = win_rate(self.winning_trades, self.total_trades);
    }
}

/// Winning share of all trades, in percent with one decimal.
pub fn win_rate(wins: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = wins as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Metadata;
    use crate::trading::{Side, Symbol};

    fn record(pnl_usd: f64) -> TradeRecord {
        let now = Utc::now();
        TradeRecord {
            id: format!("t_{}", pnl_usd),
            symbol: Symbol::Btc,
            side: Side::Buy,
            amount: 10.0,
            entry_price: 100.0,
            exit_price: 101.0,
            pnl_pct: 1.0,
            pnl_usd,
            ticks: 20,
            started_at: now,
            finished_at: now,
        }
    }

    fn user() -> User {
        User::new(
            NewUser {
                id: 7,
                first_name: "Ada".into(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_defaults() {
        let u = user();
        assert_eq!(u.language_code, "en");
        assert_eq!(u.status, UserStatus::Active);
        assert_eq!(u.balance, 0.0);
    }

    #[test]
    fn test_trade_history_is_capped() {
        let mut u = user();
        for i in 0..5 {
            u.push_trade(record(i as f64 - 1.0), 3);
        }
        assert_eq!(u.trade_history.len(), 3);
        assert_eq!(u.total_trades, 5);
        assert_eq!(u.trade_history[0].pnl_usd, 1.0);
        // -1, 0, 1, 2, 3: three winners out of five, history or not.
        assert_eq!(u.winning_trades, 3);
        assert_eq!(u.win_rate, 60.0);
    }

    #[test]
    fn test_win_rate_one_decimal() {
        assert_eq!(win_rate(1, 3), 33.3);
        assert_eq!(win_rate(2, 3), 66.7);
        assert_eq!(win_rate(0, 0), 0.0);
    }

    #[test]
    fn test_refresh_balance() {
        let mut u = user();
        u.transactions
            .push(Transaction::adjustment(10.0, Utc::now(), Metadata::new()));
        u.balance = 999.0;
        assert_eq!(u.refresh_balance(), 10.0);
        assert_eq!(u.balance, 10.0);
    }

    #[test]
    fn test_json_is_camel_case() {
        let u = user();
        let value = serde_json::to_value(&u).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["languageCode"], "en");
        assert_eq!(value["status"], "active");
        assert!(value.get("lastName").is_none());
        assert!(value.get("tradeHistory").is_some());

        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(back, u);
    }
}
