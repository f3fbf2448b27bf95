//! HTTP JSON adapter over [`LedgerService`].

pub mod handlers;
pub mod response;
pub mod routes;

use std::sync::Arc;

use crate::service::LedgerService;

pub use response::{status_for, ApiResponse};
pub use routes::create_router;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
}
