//! Key-Value Store
//!
//! The ledger treats persistence as an opaque asynchronous string store
//! with optional per-key expiry. There are no transactions across keys
//! and no compare-and-swap: every write is "last write wins".

pub mod counters;
pub mod memory;
pub mod sqlite;

pub use counters::UsageCounters;
pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Asynchronous string key/value storage.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Read a key. Missing and expired keys both read as `None`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a key, replacing any previous value. A `ttl` makes the key
    /// disappear once it has elapsed.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}

pub type SharedStore = Arc<dyn KvStore>;

/// Expiry instant in epoch millis for a TTL starting at `now_ms`.
pub(crate) fn expiry_millis(now_ms: i64, ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_ms.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)))
}
