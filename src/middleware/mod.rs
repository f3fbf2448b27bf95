//! Middleware for request logging and rate limiting.
//!
//! - Request logging with latency tracking
//! - Fixed-window rate limiting backed by the key-value store, used per IP
//!   by the router and per user by the ledger service

pub mod logging;
pub mod rate_limit;

pub use logging::request_logging;
pub use rate_limit::{ip_rate_limit, IpRateLimit, Quota, RateLimitDecision, RateLimiter};
