//! Ledger Service
//!
//! The operations exposed to the HTTP adapter (and to any other front
//! end). Every mutation follows the same shape:
//!
//! ```text
//! validate -> per-user quota -> load user -> ledger/approval op -> save
//! ```
//!
//! Loads and saves are separate store round-trips with no lock between
//! them. Two concurrent mutations of one user both succeed and the later
//! save wins, dropping the other's change.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::accounts::{NewUser, User, UserRegistry, UserStatus};
use crate::clock::SharedClock;
use crate::config::AppConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::{
    self, approval, query, round_cents, BalanceBreakdown, Metadata, Transaction,
    TransactionFilter, TransactionSort, TransactionType, MAX_AMOUNT,
};
use crate::middleware::{Quota, RateLimiter};
use crate::store::{SharedStore, UsageCounters};
use crate::trading::{self, PriceSimulator, TradeOutcome, TradeRequest};

/// Actor recorded on admin decisions.
pub const ADMIN_ACTOR: &str = "admin";

const HEALTH_PROBE_KEY: &str = "health:probe";

/// Business rules the service enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub welcome_bonus: f64,
    pub min_withdraw: f64,
    pub trade_history_cap: usize,
    pub trade_quota: Quota,
    pub wallet_quota: Quota,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            welcome_bonus: config.ledger.welcome_bonus,
            min_withdraw: config.ledger.min_withdraw,
            trade_history_cap: config.ledger.trade_history_cap,
            trade_quota: config.rate_limits.trade,
            wallet_quota: config.rate_limits.wallet,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub user_id: i64,
    pub balance: f64,
    pub breakdown: BalanceBreakdown,
}

/// TRC20-shaped address: `T` followed by 33 ASCII alphanumerics.
pub fn is_plausible_address(address: &str) -> bool {
    address.len() == 34
        && address.starts_with('T')
        && address.chars().all(|c| c.is_ascii_alphanumeric())
}

fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::validation("amount must be > 0"));
    }
    if !ledger::is_within_limit(amount) {
        return Err(LedgerError::validation(format!("amount must be at most {MAX_AMOUNT}")));
    }
    let rounded = round_cents(amount);
    if rounded <= 0.0 {
        return Err(LedgerError::validation("amount must be at least 0.01"));
    }
    Ok(rounded)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct LedgerService {
    registry: UserRegistry,
    limiter: Arc<RateLimiter>,
    counters: UsageCounters,
    simulator: PriceSimulator,
    store: SharedStore,
    clock: SharedClock,
    settings: ServiceSettings,
}

impl LedgerService {
    pub fn new(store: SharedStore, clock: SharedClock, config: &AppConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            store.clone(),
            clock.clone(),
            config.rate_limits.expiry_buffer(),
        ));
        Self {
            registry: UserRegistry::new(store.clone(), clock.clone(), config.cache.ttl()),
            limiter,
            counters: UsageCounters::new(store.clone()),
            simulator: PriceSimulator::new(config.ledger.simulation_seed),
            store,
            clock,
            settings: ServiceSettings::from_config(config),
        }
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    pub fn counters(&self) -> &UsageCounters {
        &self.counters
    }

    pub fn registry(&self) -> &UserRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Whether the store answers a read.
    pub async fn store_reachable(&self) -> bool {
        self.store.get(HEALTH_PROBE_KEY).await.is_ok()
    }

    async fn load(&self, user_id: i64) -> Result<User> {
        self.registry
            .get(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    async fn enforce_quota(&self, user_id: i64, action: &'static str, quota: Quota) -> Result<()> {
        let decision = self
            .limiter
            .check(&format!("user:{user_id}:{action}"), quota)
            .await;
        if !decision.allowed {
            warn!(user_id, action, reset_at_ms = decision.reset_at_ms, "user rate limit exceeded");
            return Err(LedgerError::UserRateLimited {
                user_id,
                action,
                reset_at_ms: decision.reset_at_ms,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Create a user with the welcome bonus already in the ledger.
    pub async fn register_user(&self, profile: NewUser) -> Result<User> {
        if profile.id <= 0 {
            return Err(LedgerError::validation("user id must be a positive integer"));
        }
        let first_name = profile.first_name.trim().to_string();
        if first_name.is_empty() {
            return Err(LedgerError::validation("firstName is required"));
        }

        if self.registry.get(profile.id).await?.is_some() {
            return Err(LedgerError::AlreadyRegistered(profile.id));
        }

        let now = self.clock.now();
        let mut user = User::new(
            NewUser {
                id: profile.id,
                first_name,
                last_name: non_empty(profile.last_name),
                username: non_empty(profile.username),
                language_code: non_empty(profile.language_code),
            },
            now,
        );

        if self.settings.welcome_bonus > 0.0 {
            let mut metadata = Metadata::new();
            metadata.insert("reason".into(), json!("welcome_bonus"));
            user.transactions.push(Transaction::adjustment(
                self.settings.welcome_bonus,
                now,
                metadata,
            ));
        }

        self.registry.save(&mut user).await?;
        self.counters.increment("user.register").await;
        info!(user_id = user.id, balance = user.balance, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.registry.get(user_id).await
    }

    pub async fn get_balance(&self, user_id: i64) -> Result<BalanceView> {
        let user = self.load(user_id).await?;
        let breakdown = ledger::breakdown(&user.transactions);
        Ok(BalanceView {
            user_id,
            balance: breakdown.total(),
            breakdown,
        })
    }

    pub async fn set_user_status(
        &self,
        user_id: i64,
        status: UserStatus,
        reason: Option<&str>,
    ) -> Result<User> {
        let mut user = self.load(user_id).await?;
        let previous = user.status;
        user.status = status;
        self.registry.save(&mut user).await?;
        info!(user_id, from = %previous, to = %status, reason = reason.unwrap_or(""), "user status changed");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Wallet submissions
    // ------------------------------------------------------------------

    /// Queue a deposit for review. The balance is untouched until approval.
    pub async fn submit_deposit(
        &self,
        user_id: i64,
        amount: f64,
        reference: Option<String>,
    ) -> Result<Transaction> {
        let amount = validate_amount(amount)?;
        self.enforce_quota(user_id, "wallet", self.settings.wallet_quota)
            .await?;
        let mut user = self.load(user_id).await?;

        let mut metadata = Metadata::new();
        if let Some(reference) = non_empty(reference) {
            metadata.insert("reference".into(), json!(reference));
        }
        let tx = Transaction::deposit(amount, self.clock.now(), metadata);
        user.transactions.push(tx.clone());
        self.registry.save(&mut user).await?;

        self.counters.increment("api.deposit").await;
        info!(user_id, tx_id = %tx.id, amount, "deposit submitted");
        Ok(tx)
    }

    /// Queue a withdrawal for review.
    ///
    /// Funds are checked against the current balance, which already
    /// includes approved withdrawals but not other pending ones, so several
    /// pending requests can together exceed the balance.
    pub async fn submit_withdraw(
        &self,
        user_id: i64,
        amount: f64,
        address: &str,
    ) -> Result<Transaction> {
        let amount = validate_amount(amount)?;
        let address = address.trim();
        if !is_plausible_address(address) {
            return Err(LedgerError::validation(
                "address must be a TRC20 address (34 characters starting with T)",
            ));
        }
        self.enforce_quota(user_id, "wallet", self.settings.wallet_quota)
            .await?;
        let mut user = self.load(user_id).await?;

        let balance = ledger::recompute(&user.transactions);
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance,
                requested: amount,
            });
        }
        if amount < self.settings.min_withdraw {
            return Err(LedgerError::validation(format!(
                "minimum withdrawal is {:.2}",
                self.settings.min_withdraw
            )));
        }

        let mut metadata = Metadata::new();
        metadata.insert("address".into(), json!(address));
        let tx = Transaction::withdraw(amount, self.clock.now(), metadata);
        user.transactions.push(tx.clone());
        self.registry.save(&mut user).await?;

        self.counters.increment("api.withdraw").await;
        info!(user_id, tx_id = %tx.id, amount, "withdrawal submitted");
        Ok(tx)
    }

    // ------------------------------------------------------------------
    // Approvals
    // ------------------------------------------------------------------

    /// Load, apply one state-machine step to one transaction, save.
    async fn transition<F>(&self, user_id: i64, tx_id: &str, step: F) -> Result<(User, Transaction)>
    where
        F: FnOnce(&mut Transaction, DateTime<Utc>) -> Result<()>,
    {
        let mut user = self.load(user_id).await?;
        let now = self.clock.now();
        let tx = user
            .transaction_mut(tx_id)
            .ok_or_else(|| LedgerError::TransactionNotFound {
                user_id,
                tx_id: tx_id.to_string(),
            })?;

        if let Err(e) = step(tx, now) {
            warn!(user_id, tx_id, error = %e, "transition rejected");
            return Err(e);
        }
        let updated = tx.clone();

        self.registry.save(&mut user).await?;
        info!(
            user_id,
            tx_id,
            kind = %updated.kind,
            status = %updated.status,
            balance = user.balance,
            "transaction updated"
        );
        Ok((user, updated))
    }

    pub async fn approve_deposit(&self, user_id: i64, tx_id: &str) -> Result<f64> {
        let (user, _) = self
            .transition(user_id, tx_id, |tx, now| {
                approval::approve_deposit(tx, ADMIN_ACTOR, now)
            })
            .await?;
        self.counters.increment("admin.approve").await;
        Ok(user.balance)
    }

    pub async fn reject_deposit(
        &self,
        user_id: i64,
        tx_id: &str,
        reason: Option<&str>,
    ) -> Result<Transaction> {
        let (_, tx) = self
            .transition(user_id, tx_id, |tx, now| {
                approval::reject(tx, TransactionType::Deposit, reason, ADMIN_ACTOR, now)
            })
            .await?;
        self.counters.increment("admin.reject").await;
        Ok(tx)
    }

    pub async fn approve_withdraw(&self, user_id: i64, tx_id: &str) -> Result<f64> {
        let (user, _) = self
            .transition(user_id, tx_id, |tx, now| {
                approval::approve_withdraw(tx, ADMIN_ACTOR, now)
            })
            .await?;
        self.counters.increment("admin.approve").await;
        Ok(user.balance)
    }

    pub async fn reject_withdraw(
        &self,
        user_id: i64,
        tx_id: &str,
        reason: Option<&str>,
    ) -> Result<Transaction> {
        let (_, tx) = self
            .transition(user_id, tx_id, |tx, now| {
                approval::reject(tx, TransactionType::Withdraw, reason, ADMIN_ACTOR, now)
            })
            .await?;
        self.counters.increment("admin.reject").await;
        Ok(tx)
    }

    pub async fn complete_withdraw(
        &self,
        user_id: i64,
        tx_id: &str,
        settlement_ref: Option<&str>,
    ) -> Result<Transaction> {
        let (_, tx) = self
            .transition(user_id, tx_id, |tx, now| {
                approval::complete_withdraw(tx, settlement_ref, now)
            })
            .await?;
        Ok(tx)
    }

    /// Set the balance to `new_balance` by recording the difference as an
    /// ADJUSTMENT. A zero difference is still recorded.
    pub async fn adjust_balance(
        &self,
        user_id: i64,
        new_balance: f64,
        reason: Option<&str>,
    ) -> Result<Transaction> {
        if !new_balance.is_finite() || new_balance < 0.0 {
            return Err(LedgerError::validation("newBalance must be a number >= 0"));
        }
        if !ledger::is_within_limit(new_balance) {
            return Err(LedgerError::validation(format!(
                "newBalance must be at most {MAX_AMOUNT}"
            )));
        }
        let target = round_cents(new_balance);
        let mut user = self.load(user_id).await?;
        let previous = ledger::recompute(&user.transactions);
        let delta = round_cents(target - previous);

        let mut metadata = Metadata::new();
        metadata.insert(
            "reason".into(),
            json!(reason.map(str::trim).filter(|r| !r.is_empty()).unwrap_or("admin adjustment")),
        );
        metadata.insert("actor".into(), json!(ADMIN_ACTOR));
        metadata.insert("previousBalance".into(), json!(previous));

        let tx = Transaction::adjustment(delta, self.clock.now(), metadata);
        user.transactions.push(tx.clone());
        self.registry.save(&mut user).await?;

        info!(user_id, tx_id = %tx.id, previous, new_balance = user.balance, "balance adjusted");
        Ok(tx)
    }

    // ------------------------------------------------------------------
    // Trading
    // ------------------------------------------------------------------

    pub async fn execute_trade(&self, request: &TradeRequest) -> Result<TradeOutcome> {
        let order = request.validate()?;
        let user_id = request.user_id;
        self.enforce_quota(user_id, "trade", self.settings.trade_quota)
            .await?;

        let mut user = self.load(user_id).await?;
        if user.is_blocked() {
            warn!(user_id, "trade rejected for blocked user");
            return Err(LedgerError::UserBlocked(user_id));
        }

        let outcome = trading::settle(
            &mut user,
            &order,
            &self.simulator,
            self.clock.now(),
            self.settings.trade_history_cap,
        )?;
        self.registry.save(&mut user).await?;

        self.counters.increment("api.trade").await;
        info!(
            user_id,
            trade_id = %outcome.trade.id,
            symbol = %outcome.trade.symbol,
            side = %outcome.trade.side,
            pnl_usd = outcome.trade.pnl_usd,
            pnl_pct = outcome.trade.pnl_pct,
            new_balance = outcome.new_balance,
            "trade executed"
        );
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn list_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
        sort: TransactionSort,
    ) -> Result<Vec<Transaction>> {
        let user = self.load(user_id).await?;
        Ok(query::list(&user.transactions, filter, sort))
    }
}
