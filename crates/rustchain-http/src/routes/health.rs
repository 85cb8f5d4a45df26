use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let now = crate::now_unix();
    let tip_age_slots = state.chain_clock.current_slot(now);
    let db_rw = state.db.read(|conn| conn.query_row("SELECT 1", [], |_| Ok(()))).is_ok();

    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_s": (now - state.started_at).max(0),
        "db_rw": db_rw,
        "tip_age_slots": tip_age_slots,
    }))
}
