//! Trade settlement
//!
//! Turns a validated order into a TRADE_PNL transaction plus a display
//! record and folds both into the user. Persisting is the caller's job.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::models::{Side, TradeOrder, TradeRecord};
use super::simulator::{round4, PriceSimulator, TICK_COUNT};
use crate::accounts::User;
use crate::error::{LedgerError, Result};
use crate::ledger::{self, round_cents, Metadata, Transaction};

/// Display entry price for trades settled with a client-side P&L.
const PRECOMPUTED_ENTRY_PRICE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOutcome {
    pub trade: TradeRecord,
    pub ticks: Vec<f64>,
    pub transaction_id: String,
    pub new_balance: f64,
}

/// Priced trade before it touches any user.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedTrade {
    pub record: TradeRecord,
    pub ticks: Vec<f64>,
}

/// Price an order: either from its precomputed P&L or from a simulated
/// tick series.
pub fn price(order: &TradeOrder, simulator: &PriceSimulator, now: DateTime<Utc>) -> PricedTrade {
    let (ticks, pnl_pct, pnl_usd) = match order.pnl {
        Some(pnl) => {
            let pct = pnl / order.amount * 100.0;
            let exit = round4(PRECOMPUTED_ENTRY_PRICE * (1.0 + pct / 100.0));
            (vec![PRECOMPUTED_ENTRY_PRICE, exit], pct, pnl)
        }
        None => {
            let ticks = simulator.ticks(TICK_COUNT);
            let entry = ticks.first().copied().unwrap_or(PRECOMPUTED_ENTRY_PRICE);
            let exit = ticks.last().copied().unwrap_or(entry);
            let mut pct = (exit - entry) / entry * 100.0;
            if order.side == Side::Sell {
                pct = -pct;
            }
            (ticks, pct, pct / 100.0 * order.amount)
        }
    };

    let entry_price = ticks.first().copied().unwrap_or(PRECOMPUTED_ENTRY_PRICE);
    let exit_price = ticks.last().copied().unwrap_or(entry_price);
    let tick_count = ticks.len() as u32;

    let record = TradeRecord {
        id: format!("t_{}", Uuid::new_v4().simple()),
        symbol: order.symbol,
        side: order.side,
        amount: round_cents(order.amount),
        entry_price,
        exit_price,
        pnl_pct: round_cents(pnl_pct),
        pnl_usd: round_cents(pnl_usd),
        ticks: tick_count,
        started_at: now - Duration::seconds(i64::from(tick_count)),
        finished_at: now,
    };
    PricedTrade { record, ticks }
}

/// Settle `order` against `user`.
///
/// Without a precomputed P&L the stake must be covered by the current
/// balance. With one, the balance check is skipped: those trades were
/// already played out on the client.
pub fn settle(
    user: &mut User,
    order: &TradeOrder,
    simulator: &PriceSimulator,
    now: DateTime<Utc>,
    history_cap: usize,
) -> Result<TradeOutcome> {
    if order.pnl.is_none() {
        let balance = ledger::recompute(&user.transactions);
        if balance < order.amount {
            return Err(LedgerError::InsufficientFunds {
                balance,
                requested: order.amount,
            });
        }
    }

    let PricedTrade { record, ticks } = price(order, simulator, now);

    let mut metadata = Metadata::new();
    metadata.insert("tradeId".into(), json!(record.id));
    metadata.insert("symbol".into(), json!(record.symbol));
    metadata.insert("side".into(), json!(record.side));
    metadata.insert("pnlPct".into(), json!(record.pnl_pct));
    metadata.insert("entryPrice".into(), json!(record.entry_price));
    metadata.insert("exitPrice".into(), json!(record.exit_price));

    let tx = Transaction::trade_pnl(&record.id, record.pnl_usd, now, metadata);
    let transaction_id = tx.id.clone();
    user.transactions.push(tx);
    user.push_trade(record.clone(), history_cap);
    let new_balance = user.refresh_balance();

    Ok(TradeOutcome {
        trade: record,
        ticks,
        transaction_id,
        new_balance,
    })
}
