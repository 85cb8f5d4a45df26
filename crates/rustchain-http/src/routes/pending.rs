use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /pending/confirm` (admin) — commit every matured pending transfer.
pub async fn confirm(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = crate::now_unix();
    let confirmed = state.ledger.confirm_matured_pending(now)?;
    Ok(Json(json!({ "confirmed": confirmed })))
}
