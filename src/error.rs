//! Ledger errors
//!
//! Every failure the ledger can report, each mapped to one stable wire
//! code via [`LedgerError::kind`]. Transport adapters translate kinds into
//! their own responses.

use crate::ledger::{TransactionStatus, TransactionType};
use crate::store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("transaction {tx_id} not found for user {user_id}")]
    TransactionNotFound { user_id: i64, tx_id: String },

    #[error("insufficient funds: balance {balance:.2}, requested {requested:.2}")]
    InsufficientFunds { balance: f64, requested: f64 },

    #[error("transaction {tx_id} is {status}, expected {expected}")]
    InvalidStatus {
        tx_id: String,
        status: TransactionStatus,
        expected: TransactionStatus,
    },

    #[error("transaction {0} is already approved")]
    AlreadyApproved(String),

    #[error("transaction {tx_id} is a {actual}, not a {expected}")]
    WrongTransactionType {
        tx_id: String,
        actual: TransactionType,
        expected: TransactionType,
    },

    #[error("user {0} is already registered")]
    AlreadyRegistered(i64),

    #[error("user {0} is blocked")]
    UserBlocked(i64),

    #[error("rate limit exceeded, retry after {reset_at_ms}")]
    RateLimited { reset_at_ms: i64 },

    #[error("{action} rate limit exceeded for user {user_id}, retry after {reset_at_ms}")]
    UserRateLimited {
        user_id: i64,
        action: &'static str,
        reset_at_ms: i64,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    InsufficientFunds,
    InvalidStatus,
    AlreadyApproved,
    AlreadyRegistered,
    UserBlocked,
    RateLimit,
    RateLimitUser,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::InvalidStatus => "INVALID_STATUS",
            ErrorKind::AlreadyApproved => "ALREADY_APPROVED",
            ErrorKind::AlreadyRegistered => "ALREADY_REGISTERED",
            ErrorKind::UserBlocked => "USER_BLOCKED",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::RateLimitUser => "RATE_LIMIT_USER",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) | LedgerError::WrongTransactionType { .. } => {
                ErrorKind::ValidationError
            }
            LedgerError::UserNotFound(_) | LedgerError::TransactionNotFound { .. } => {
                ErrorKind::NotFound
            }
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::InvalidStatus { .. } => ErrorKind::InvalidStatus,
            LedgerError::AlreadyApproved(_) => ErrorKind::AlreadyApproved,
            LedgerError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            LedgerError::UserBlocked(_) => ErrorKind::UserBlocked,
            LedgerError::RateLimited { .. } => ErrorKind::RateLimit,
            LedgerError::UserRateLimited { .. } => ErrorKind::RateLimitUser,
            LedgerError::Unauthorized => ErrorKind::Unauthorized,
            LedgerError::Store(_) | LedgerError::Serialization(_) | LedgerError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Message safe to show an end user or admin. Internal failures are
    /// reported generically; their detail belongs in the logs.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}
