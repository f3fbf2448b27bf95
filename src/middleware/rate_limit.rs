//! Rate limiting.
//!
//! Fixed-window counters kept in the key-value store, shared by the per-IP
//! middleware and the per-user quotas of the ledger service. Increments are
//! read-modify-write, so concurrent callers can lose counts. When the store
//! misbehaves the limiter fails open.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::clock::SharedClock;
use crate::error::LedgerError;
use crate::store::SharedStore;

/// Requests allowed per fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub max: u32,
    pub window_secs: u64,
}

impl Quota {
    pub const fn new(max: u32, window_secs: u64) -> Self {
        Self { max, window_secs }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// End of the current window, epoch millis.
    pub reset_at_ms: i64,
}

pub struct RateLimiter {
    store: SharedStore,
    clock: SharedClock,
    /// Extra lifetime on counter keys past the end of their window.
    expiry_buffer: Duration,
}

impl RateLimiter {
    pub fn new(store: SharedStore, clock: SharedClock, expiry_buffer: Duration) -> Self {
        Self {
            store,
            clock,
            expiry_buffer,
        }
    }

    /// Count one request against `key` and decide whether it fits in the
    /// current window.
    pub async fn allow(&self, key: &str, max: u32, window_secs: u64) -> RateLimitDecision {
        let window_ms = i64::try_from(window_secs.max(1).saturating_mul(1000)).unwrap_or(i64::MAX);
        let now = self.clock.now_millis();
        let window_start = now.div_euclid(window_ms) * window_ms;
        let reset_at_ms = window_start.saturating_add(window_ms);
        let counter_key = format!("ratelimit:{key}:{window_start}");

        let fail_open = RateLimitDecision {
            allowed: true,
            remaining: max,
            reset_at_ms,
        };

        let current = match self.store.get(&counter_key).await {
            Ok(raw) => raw.and_then(|s| s.trim().parse::<u32>().ok()).unwrap_or(0),
            Err(e) => {
                warn!(key = key, error = %e, "rate limiter store read failed, allowing request");
                return fail_open;
            }
        };

        let count = current.saturating_add(1);
        let ttl = Duration::from_secs(window_secs) + self.expiry_buffer;
        if let Err(e) = self.store.put(&counter_key, &count.to_string(), Some(ttl)).await {
            warn!(key = key, error = %e, "rate limiter store write failed, allowing request");
            return fail_open;
        }

        RateLimitDecision {
            allowed: count <= max,
            remaining: max.saturating_sub(count),
            reset_at_ms,
        }
    }

    pub async fn check(&self, key: &str, quota: Quota) -> RateLimitDecision {
        self.allow(key, quota.max, quota.window_secs).await
    }
}

/// State for [`ip_rate_limit`].
#[derive(Clone)]
pub struct IpRateLimit {
    pub limiter: Arc<RateLimiter>,
    pub quota: Quota,
}

/// Global per-IP limit in front of the API routes.
pub async fn ip_rate_limit(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<IpRateLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();
    let decision = state.limiter.check(&format!("ip:{ip}"), state.quota).await;

    if !decision.allowed {
        warn!(ip = %ip, reset_at_ms = decision.reset_at_ms, "Rate limit exceeded");
        let now_ms = state.limiter.clock.now_millis();
        let retry_after_secs = ((decision.reset_at_ms - now_ms).max(0) + 999) / 1000;

        let mut response = LedgerError::RateLimited {
            reset_at_ms: decision.reset_at_ms,
        }
        .into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
            response.headers_mut().insert("Retry-After", value);
        }
        return response;
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.reset_at_ms.to_string()) {
        headers.insert("X-RateLimit-Reset", value);
    }
    response
}
