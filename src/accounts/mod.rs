//! Accounts
//!
//! User records, the process-local cache and the registry that persists
//! them in the key-value store.

pub mod cache;
pub mod models;
pub mod registry;

pub use cache::UserCache;
pub use models::{NewUser, User, UserStatus};
pub use registry::UserRegistry;
