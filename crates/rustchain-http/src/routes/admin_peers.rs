use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use rustchain_storage::P2pRepo;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /admin/peers/<node_id>/revoke` — clear a pinned TOFU peer key so
/// the next message from that peer re-triggers trust-on-first-use.
pub async fn revoke(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    P2pRepo::new(&state.db).revoke(&node_id)?;
    Ok(Json(json!({ "revoked": node_id })))
}
