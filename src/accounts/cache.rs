//! Process-local user cache with a fixed TTL.
//!
//! Latency only. The store stays authoritative; entries are dropped on
//! expiry and the cache is lost on restart.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

use super::models::User;
use crate::clock::SharedClock;

struct CachedUser {
    user: User,
    inserted_at_ms: i64,
}

pub struct UserCache {
    entries: RwLock<HashMap<i64, CachedUser>>,
    ttl_ms: i64,
    clock: SharedClock,
}

impl UserCache {
    /// A zero `ttl` disables caching entirely.
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            clock,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl_ms > 0
    }

    pub fn get(&self, id: i64) -> Option<User> {
        if !self.is_enabled() {
            return None;
        }
        let now = self.clock.now_millis();
        {
            let entries = self.entries.read();
            match entries.get(&id) {
                Some(entry) if now - entry.inserted_at_ms < self.ttl_ms => {
                    return Some(entry.user.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired
        self.entries.write().remove(&id);
        None
    }

    pub fn insert(&self, user: &User) {
        if !self.is_enabled() {
            return;
        }
        let entry = CachedUser {
            user: user.clone(),
            inserted_at_ms: self.clock.now_millis(),
        };
        self.entries.write().insert(user.id, entry);
    }

    pub fn invalidate(&self, id: i64) {
        self.entries.write().remove(&id);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
