//! User Registry
//!
//! Owns the canonical user record. Reads go cache first, then the store;
//! writes go to the store, then the cache. A save is a single key write, so
//! two concurrent read-modify-write cycles on one user resolve as "last
//! write wins". There is no version check on save.

use std::time::Duration;
use tracing::{debug, error};

use super::cache::UserCache;
use super::models::User;
use crate::clock::SharedClock;
use crate::error::Result;
use crate::store::SharedStore;

pub fn user_key(id: i64) -> String {
    format!("user:{id}")
}

pub struct UserRegistry {
    store: SharedStore,
    cache: UserCache,
    clock: SharedClock,
}

impl UserRegistry {
    pub fn new(store: SharedStore, clock: SharedClock, cache_ttl: Duration) -> Self {
        Self {
            cache: UserCache::new(cache_ttl, clock.clone()),
            store,
            clock,
        }
    }

    /// `Ok(None)` means the user was never registered. Store failures are
    /// errors, not "not found".
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        if let Some(user) = self.cache.get(id) {
            debug!(user_id = id, "user cache hit");
            return Ok(Some(user));
        }

        let raw = self.store.get(&user_key(id)).await.map_err(|e| {
            error!(user_id = id, error = %e, "user read failed");
            e
        })?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let user: User = serde_json::from_str(&raw).map_err(|e| {
            error!(user_id = id, error = %e, "stored user record is not valid JSON");
            e
        })?;
        self.cache.insert(&user);
        Ok(Some(user))
    }

    /// Refresh the derived balance and `updatedAt`, then persist. The cache
    /// is only updated once the store write has succeeded.
    pub async fn save(&self, user: &mut User) -> Result<()> {
        user.refresh_balance();
        user.updated_at = self.clock.now();

        let raw = serde_json::to_string(user)?;
        self.store
            .put(&user_key(user.id), &raw, None)
            .await
            .map_err(|e| {
                error!(user_id = user.id, error = %e, "user write failed");
                self.cache.invalidate(user.id);
                e
            })?;

        self.cache.insert(user);
        debug!(user_id = user.id, balance = user.balance, "user saved");
        Ok(())
    }

    pub fn cache(&self) -> &UserCache {
        &self.cache
    }
}
