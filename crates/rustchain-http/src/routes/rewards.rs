use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use rustchain_epoch::{settle_due_epochs, settle_epoch};
use rustchain_storage::{EpochRepo, LedgerRepo};

use crate::error::ApiError;
use crate::json::JsonBody;
use crate::state::AppState;

/// `POST /rewards/settle` (admin). With `{"epoch": n}` in the body, force
/// that single epoch regardless of whether it is already due; with an
/// empty body, settle every epoch the scheduler considers due right now.
pub async fn settle(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Value>, ApiError> {
    let now = crate::now_unix();
    let repo = EpochRepo::new(&state.db);
    let ledger = LedgerRepo::new(&state.db);

    if let Some(epoch) = body.get("epoch").and_then(Value::as_u64) {
        settle_epoch(&repo, &ledger, epoch, state.epoch_pot_urtc, now)?;
        return Ok(Json(json!({ "settled_epochs": [epoch] })));
    }

    let current_epoch = state.chain_clock.current_epoch(now);
    let count = settle_due_epochs(&repo, &ledger, current_epoch, state.epoch_pot_urtc, now)?;
    Ok(Json(json!({ "settled_count": count })))
}

/// `GET /rewards/epoch/<n>` — per-epoch distribution.
pub async fn epoch_rewards(
    State(state): State<AppState>,
    Path(epoch): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let repo = EpochRepo::new(&state.db);
    let settled = repo.is_settled(epoch)?;
    let rewards = repo.rewards_for_epoch(epoch)?;
    Ok(Json(json!({
        "epoch": epoch,
        "settled": settled,
        "rewards": rewards.into_iter().map(|(miner_id, share_urtc)| {
            json!({ "miner_id": miner_id, "share_urtc": share_urtc })
        }).collect::<Vec<_>>(),
    })))
}
