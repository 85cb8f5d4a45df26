use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use rustchain_core::constants::URTC_PER_RTC;
use rustchain_ledger::TransferResult;
use rustchain_storage::LedgerRepo;

use crate::error::ApiError;
use crate::json::JsonBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub miner_id: String,
}

/// `GET /wallet/balance?miner_id=` — the miner identifier doubles as the
/// wallet address throughout the system, so this is a direct lookup.
pub async fn balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<Value>, ApiError> {
    let ledger = LedgerRepo::new(&state.db);
    let (amount_urtc, wallet_nonce) = ledger.balance_and_nonce(&query.miner_id)?;
    Ok(Json(json!({
        "address": query.miner_id,
        "amount_urtc": amount_urtc,
        "amount_rtc": amount_urtc as f64 / URTC_PER_RTC as f64,
        "wallet_nonce": wallet_nonce,
    })))
}

fn transfer_response(result: TransferResult) -> Value {
    match result {
        TransferResult::Executed { from_balance, to_balance } => json!({
            "status": "executed",
            "from_balance_urtc": from_balance,
            "to_balance_urtc": to_balance,
        }),
        TransferResult::Pending { id, confirms_at } => json!({
            "status": "pending",
            "id": id,
            "confirms_at": confirms_at,
        }),
    }
}

pub async fn transfer_signed(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Value>, ApiError> {
    let now = crate::now_unix();
    let result = state.ledger.transfer_signed(&body, now)?;
    Ok(Json(transfer_response(result)))
}

pub async fn withdraw_request(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Value>, ApiError> {
    let now = crate::now_unix();
    let result = state.ledger.withdraw(&body, now)?;
    Ok(Json(transfer_response(result)))
}
