use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use rustchain_core::constants::ATTESTATION_RECENT_TTL_SECONDS;
use rustchain_storage::MinerRepo;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/miners` — miners attested within the last
/// [`ATTESTATION_RECENT_TTL_SECONDS`], with their tier and multiplier.
pub async fn list_miners(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = crate::now_unix();
    let repo = MinerRepo::new(&state.db);
    let rows = repo.recent_attestations(now, ATTESTATION_RECENT_TTL_SECONDS)?;

    let miners: Vec<Value> = rows
        .into_iter()
        .map(|row| {
            json!({
                "miner_id": row.miner_id,
                "hardware_type": row.device_family,
                "device_arch": row.device_arch,
                "antiquity_tier": row.antiquity_tier,
                "antiquity_multiplier": row.antiquity_multiplier,
                "entropy_score": row.entropy_score,
                "arch_validation_score": row.arch_validation_score,
                "ts_ok": row.ts_ok,
            })
        })
        .collect();

    Ok(Json(json!({ "miners": miners })))
}
