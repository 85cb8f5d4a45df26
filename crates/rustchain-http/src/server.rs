use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::{BoxError, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use rustchain_core::constants::REQUEST_DEADLINE_SECONDS;

use crate::admin::require_admin;
use crate::routes::{admin_peers, attest, config, epoch, health, miners, p2p, pending, rewards, sync, wallet};
use crate::state::AppState;

async fn handle_timeout(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request deadline exceeded".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("unhandled error: {err}"))
    }
}

/// Assemble the full HTTP surface. Admin routes sit behind
/// [`require_admin`]; everything else is permissive read/write per the
/// handler's own preflight.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/rewards/settle", post(rewards::settle))
        .route("/sync/status", get(sync::status))
        .route("/pending/confirm", post(pending::confirm))
        .route("/admin/peers/:node_id/revoke", post(admin_peers::revoke))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/epoch", get(epoch::epoch))
        .route("/config", get(config::config))
        .route("/api/miners", get(miners::list_miners))
        .route("/attest/challenge", post(attest::challenge))
        .route("/attest/submit", post(attest::submit))
        .route("/wallet/balance", get(wallet::balance))
        .route("/wallet/transfer/signed", post(wallet::transfer_signed))
        .route("/withdraw/request", post(wallet::withdraw_request))
        .route("/rewards/epoch/:epoch", get(rewards::epoch_rewards))
        .route("/p2p/inv", post(p2p::inv))
        .route("/p2p/data", post(p2p::data));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(Duration::from_secs(REQUEST_DEADLINE_SECONDS)),
        )
        .with_state(state)
}
