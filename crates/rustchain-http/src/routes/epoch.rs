use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use rustchain_storage::EpochRepo;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn epoch(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = crate::now_unix();
    let slot = state.chain_clock.current_slot(now);
    let current_epoch = state.chain_clock.current_epoch(now);

    let repo = EpochRepo::new(&state.db);
    let enrolled_miners = repo.enrolled_count(current_epoch)?;

    Ok(Json(json!({
        "epoch": current_epoch,
        "slot": slot,
        "blocks_per_epoch": state.chain_clock.epoch_slots,
        "enrolled_miners": enrolled_miners,
        "epoch_pot": state.epoch_pot_urtc,
    })))
}
