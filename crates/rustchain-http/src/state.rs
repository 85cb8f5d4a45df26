use std::sync::Arc;

use serde::Serialize;

use rustchain_attest::{AttestService, RateLimiter};
use rustchain_epoch::ChainClock;
use rustchain_ledger::{LedgerConfig, LedgerService};
use rustchain_p2p::P2pNetwork;
use rustchain_storage::StateDb;

use crate::net::TrustedProxies;

/// Everything a handler needs, cloned cheaply (every field is an `Arc` or
/// `Copy`). Built once at boot by `rustchain-node` and handed to
/// [`crate::server::build_router`].
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<StateDb>,
    pub attest: Arc<AttestService>,
    pub ledger: Arc<LedgerService>,
    pub p2p: Arc<P2pNetwork>,
    pub chain_clock: ChainClock,
    pub epoch_pot_urtc: u64,
    pub admin_key: String,
    pub admin_limiter: Arc<RateLimiter>,
    pub trusted_proxies: TrustedProxies,
    pub started_at: i64,
    pub config_snapshot: Arc<ConfigSnapshot>,
}

/// The subset of effective runtime configuration surfaced on `GET /config`.
/// Mirrors whatever was resolved from environment variables at boot, not
/// the defaults themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub genesis_timestamp: i64,
    pub block_time_seconds: i64,
    pub epoch_slots: u64,
    pub per_epoch_pot_urtc: u64,
    pub antiquity_horizon_years: f64,
    pub withdrawal_fee_urtc: u64,
    pub min_withdrawal_urtc: u64,
    pub pending_threshold_urtc: u64,
    pub pending_confirm_delay_seconds: i64,
    pub runtime_env: String,
}
