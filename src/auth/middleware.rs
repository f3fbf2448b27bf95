//! Authentication Middleware
//! Mission: Protect admin endpoints with a shared bearer token

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::LedgerError;

/// Configured admin token. An empty token locks every admin route.
#[derive(Clone)]
pub struct AdminToken(Arc<str>);

impl AdminToken {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref().trim()))
    }

    pub fn is_configured(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn verify(&self, presented: &str) -> bool {
        self.is_configured() && constant_time_eq(self.0.as_bytes(), presented.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extract a bearer token from the Authorization header
pub fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Admin auth middleware that validates the bearer token
pub async fn admin_auth(
    State(token): State<AdminToken>,
    req: Request,
    next: Next,
) -> Result<Response, LedgerError> {
    let presented = bearer_token(&req).ok_or(LedgerError::Unauthorized)?;

    if !token.verify(presented) {
        warn!(path = %req.uri().path(), "admin request rejected");
        return Err(LedgerError::Unauthorized);
    }

    Ok(next.run(req).await)
}
