use axum::extract::State;
use axum::Json;

use rustchain_p2p::GossipEnvelope;

use crate::error::ApiError;
use crate::json::JsonBody;
use crate::state::AppState;

/// `POST /p2p/inv` — a peer announcing hashes it has; reply with `getdata`
/// for whatever we don't already have.
pub async fn inv(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<GossipEnvelope>, ApiError> {
    let now = crate::now_unix();
    let envelope: GossipEnvelope =
        serde_json::from_value(body).map_err(|_| ApiError(rustchain_core::error::RcError::InvalidJsonObject))?;
    let reply = state.p2p.handle_inv(&envelope, now)?;
    Ok(Json(reply))
}

/// `POST /p2p/data` — a peer pushing a payload we requested.
pub async fn data(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<(), ApiError> {
    let now = crate::now_unix();
    let envelope: GossipEnvelope =
        serde_json::from_value(body).map_err(|_| ApiError(rustchain_core::error::RcError::InvalidJsonObject))?;
    state.p2p.handle_data(&envelope, now)?;
    Ok(())
}
