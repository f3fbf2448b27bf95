use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;
use crate::auth::{admin_auth, AdminToken};
use crate::middleware::{ip_rate_limit, request_logging, IpRateLimit, Quota};

/// Create the API router.
///
/// Health is public and unlimited. Every other route sits behind the
/// per-IP limit; admin routes additionally require the bearer token.
pub fn create_router(state: AppState, admin_token: AdminToken, ip_quota: Quota) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/deposit/approve", post(handlers::approve_deposit))
        .route("/api/admin/deposit/reject", post(handlers::reject_deposit))
        .route("/api/admin/withdraw/approve", post(handlers::approve_withdraw))
        .route("/api/admin/withdraw/reject", post(handlers::reject_withdraw))
        .route("/api/admin/withdraw/complete", post(handlers::complete_withdraw))
        .route("/api/admin/user/:id/adjust", post(handlers::adjust_balance))
        .route("/api/admin/user/:id/status", post(handlers::set_user_status))
        .route_layer(middleware::from_fn_with_state(admin_token, admin_auth));

    let ip_limit = IpRateLimit {
        limiter: state.service.limiter(),
        quota: ip_quota,
    };

    let api_routes = Router::new()
        .route("/api/user/register", post(handlers::register_user))
        .route("/api/user/:id", get(handlers::get_user))
        .route("/api/user/:id/balance", get(handlers::get_balance))
        .route("/api/user/:id/transactions", get(handlers::list_transactions))
        .route("/api/deposit", post(handlers::submit_deposit))
        .route("/api/withdraw", post(handlers::submit_withdraw))
        .route("/api/trade", post(handlers::execute_trade))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(ip_limit, ip_rate_limit));

    let public_routes = Router::new().route("/api/health", get(handlers::health_check));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
