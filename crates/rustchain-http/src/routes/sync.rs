use axum::extract::State;
use axum::Json;

use rustchain_p2p::{compute_sync_status, SyncStatus};

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /sync/status` (admin) — Merkle roots per stable table.
pub async fn status(State(state): State<AppState>) -> Result<Json<SyncStatus>, ApiError> {
    Ok(Json(compute_sync_status(&state.db)?))
}
