use axum::extract::State;
use axum::Json;

use crate::state::{AppState, ConfigSnapshot};

pub async fn config(State(state): State<AppState>) -> Json<ConfigSnapshot> {
    Json((*state.config_snapshot).clone())
}
