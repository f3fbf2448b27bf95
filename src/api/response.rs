//! JSON envelope and error mapping for the HTTP adapter.
//!
//! ```text
//! {"success": true,  "data": ..., "requestId": "..."}
//! {"success": false, "error": "...", "code": "NOT_FOUND", "requestId": "..."}
//! ```

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ErrorKind, LedgerError};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessBody<T> {
    success: bool,
    data: T,
    request_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    error: String,
    code: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_at: Option<i64>,
    request_id: String,
}

/// Successful response wrapped in the envelope.
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let request_id = new_request_id();
        let body = SuccessBody {
            success: true,
            data: self.data,
            request_id: request_id.clone(),
        };
        with_request_id((self.status, Json(body)).into_response(), &request_id)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientFunds | ErrorKind::InvalidStatus => StatusCode::BAD_REQUEST,
        ErrorKind::AlreadyApproved | ErrorKind::AlreadyRegistered => StatusCode::CONFLICT,
        ErrorKind::UserBlocked => StatusCode::FORBIDDEN,
        ErrorKind::RateLimit | ErrorKind::RateLimitUser => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let request_id = new_request_id();
        let kind = self.kind();
        if self.is_internal() {
            tracing::error!(request_id = %request_id, error = %self, "Internal error");
        }

        let reset_at = match &self {
            LedgerError::RateLimited { reset_at_ms } => Some(*reset_at_ms),
            LedgerError::UserRateLimited { reset_at_ms, .. } => Some(*reset_at_ms),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error: self.public_message(),
            code: kind,
            reset_at,
            request_id: request_id.clone(),
        };
        with_request_id((status_for(kind), Json(body)).into_response(), &request_id)
    }
}

fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
