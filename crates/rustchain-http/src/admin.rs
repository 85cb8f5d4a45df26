use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;

use rustchain_core::error::RcError;

use crate::error::ApiError;
use crate::net::resolve_remote_ip;
use crate::state::AppState;

/// Constant-time byte comparison — avoids leaking key length/prefix via
/// early-exit timing on the admin-key check.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn admin_key_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-admin-key")
        .or_else(|| headers.get("x-api-key"))
        .and_then(|v| v.to_str().ok())
}

/// Axum middleware guarding every `/admin/*` and admin-only route: requires
/// a matching `X-Admin-Key` (or `X-API-Key`) header, and rate-limits by
/// remote address regardless of whether the key matched.
pub async fn require_admin(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();
    let ip = resolve_remote_ip(&state.trusted_proxies, remote.ip(), headers);
    let now = crate::now_unix();
    if state.admin_limiter.is_rate_limited(&ip, now) {
        return Err(ApiError(RcError::RateLimitExceeded));
    }

    let provided = admin_key_header(headers).unwrap_or("");
    if provided.is_empty() || !constant_time_eq(provided.as_bytes(), state.admin_key.as_bytes()) {
        return Err(ApiError(RcError::Unauthorized));
    }

    Ok(next.run(request).await)
}
