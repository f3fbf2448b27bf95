//! Authentication Module
//! Mission: Gate administrative API access behind a bearer token

pub mod middleware;

pub use middleware::{admin_auth, AdminToken};
