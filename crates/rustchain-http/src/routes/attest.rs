use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::json::JsonBody;
use crate::net::resolve_remote_ip;
use crate::state::AppState;

pub async fn challenge(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Value>, ApiError> {
    let now = crate::now_unix();
    let miner_id = body.get("miner_id").and_then(Value::as_str);
    let resp = state.attest.issue_challenge(miner_id, now)?;
    Ok(Json(json!({
        "nonce": resp.nonce,
        "expires_at": resp.expires_at,
    })))
}

pub async fn submit(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    JsonBody(body): JsonBody,
) -> Result<Json<Value>, ApiError> {
    let now = crate::now_unix();
    let ip = resolve_remote_ip(&state.trusted_proxies, remote.ip(), &headers);
    let outcome = state.attest.submit(&body, &ip, now)?;

    Ok(Json(json!({
        "ok": true,
        "miner": outcome.miner,
        "antiquity_tier": outcome.antiquity_tier.to_string(),
        "antiquity_multiplier": outcome.antiquity_multiplier,
        "entropy_score": outcome.entropy_score,
        "arch_validation_score": outcome.arch_validation_score,
        "epoch": outcome.epoch,
    })))
}
