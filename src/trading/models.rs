//! Trade types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, Result};
use crate::ledger::{is_within_limit, MAX_AMOUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbol {
    Btc,
    Eth,
    Xau,
}

impl Symbol {
    pub const ALL: [Symbol; 3] = [Symbol::Btc, Symbol::Eth, Symbol::Xau];

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Btc => "BTC",
            Symbol::Eth => "ETH",
            Symbol::Xau => "XAU",
        }
    }

    /// Exact, case-sensitive match on the ticker.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BTC" => Some(Symbol::Btc),
            "ETH" => Some(Symbol::Eth),
            "XAU" => Some(Symbol::Xau),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated trade request as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub user_id: i64,
    pub amount: f64,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_side")]
    pub side: String,
    /// USD result computed client-side. Skips simulation and the
    /// balance check.
    #[serde(default)]
    pub pnl: Option<f64>,
}

fn default_symbol() -> String {
    Symbol::Btc.as_str().to_string()
}

fn default_side() -> String {
    Side::Buy.as_str().to_string()
}

/// A trade request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeOrder {
    pub amount: f64,
    pub symbol: Symbol,
    pub side: Side,
    pub pnl: Option<f64>,
}

impl TradeRequest {
    pub fn validate(&self) -> Result<TradeOrder> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(LedgerError::validation("amount must be > 0"));
        }
        if !is_within_limit(self.amount) {
            return Err(LedgerError::validation(format!("amount must be at most {MAX_AMOUNT}")));
        }
        let symbol = Symbol::parse(&self.symbol)
            .ok_or_else(|| LedgerError::validation(format!("unsupported symbol: {}", self.symbol)))?;
        let side = Side::parse(&self.side)
            .ok_or_else(|| LedgerError::validation(format!("invalid side: {}", self.side)))?;
        if let Some(pnl) = self.pnl {
            if !pnl.is_finite() {
                return Err(LedgerError::validation("pnl must be a finite number"));
            }
            if !is_within_limit(pnl) {
                return Err(LedgerError::validation(format!("pnl must be between -{MAX_AMOUNT} and {MAX_AMOUNT}")));
            }
        }
        Ok(TradeOrder {
            amount: self.amount,
            symbol,
            side,
            pnl: self.pnl,
        })
    }
}

/// Display-only record kept in the user's trade history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: String,
    pub symbol: Symbol,
    pub side: Side,
    #[serde(default)]
    pub amount: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl_pct: f64,
    pub pnl_usd: f64,
    /// Number of simulated price points.
    pub ticks: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
