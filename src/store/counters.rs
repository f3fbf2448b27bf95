//! Usage counters kept in the store.
//!
//! Read-modify-write with no atomic increment: concurrent writers can lose
//! counts. Failures never propagate to the caller.

use super::SharedStore;
use tracing::warn;

const COUNTER_PREFIX: &str = "metrics:counter:";

#[derive(Clone)]
pub struct UsageCounters {
    store: SharedStore,
}

impl UsageCounters {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn key(name: &str) -> String {
        format!("{COUNTER_PREFIX}{name}")
    }

    pub async fn increment(&self, name: &str) {
        let key = Self::key(name);
        let current = match self.store.get(&key).await {
            Ok(raw) => parse_count(raw.as_deref()),
            Err(e) => {
                warn!(counter = name, error = %e, "counter read failed");
                return;
            }
        };
        if let Err(e) = self.store.put(&key, &(current + 1).to_string(), None).await {
            warn!(counter = name, error = %e, "counter write failed");
        }
    }

    /// Current value; unreadable counters read as zero.
    pub async fn get(&self, name: &str) -> u64 {
        match self.store.get(&Self::key(name)).await {
            Ok(raw) => parse_count(raw.as_deref()),
            Err(_) => 0,
        }
    }
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KvStore, MemoryKvStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_increment_and_read() {
        let store = Arc::new(MemoryKvStore::default());
        let counters = UsageCounters::new(store.clone());

        assert_eq!(counters.get("api.trade").await, 0);
        counters.increment("api.trade").await;
        counters.increment("api.trade").await;
        assert_eq!(counters.get("api.trade").await, 2);

        assert_eq!(
            store.get("metrics:counter:api.trade").await.unwrap().as_deref(),
            Some("2")
        );
    }

    #[tokio::test]
    async fn test_garbage_value_restarts_from_zero() {
        let store = Arc::new(MemoryKvStore::default());
        store
            .put("metrics:counter:api.trade", "not-a-number", None)
            .await
            .unwrap();
        let counters = UsageCounters::new(store);
        counters.increment("api.trade").await;
        assert_eq!(counters.get("api.trade").await, 1);
    }
}
