use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use rustchain_core::error::RcError;

/// Wraps [`RcError`] so this crate can implement [`IntoResponse`] for it —
/// `RcError` itself lives in `rustchain-core` and axum's trait is foreign to
/// both crates.
pub struct ApiError(pub RcError);

impl From<RcError> for ApiError {
    fn from(e: RcError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "error": self.0.error_code(),
            "detail": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
