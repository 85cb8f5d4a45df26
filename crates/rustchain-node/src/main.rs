//! rustchain-node — the RustChain full-node binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the state database
//!   2. Build the attestation, ledger and P2P services from env-derived config
//!   3. Start the settlement ticker and the P2P gossip ticker
//!   4. Serve the HTTP API

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use rustchain_attest::{AttestConfig, AttestService};
use rustchain_core::constants::{
    ADMIN_RATE_LIMIT_PER_MINUTE, DEFAULT_ANTIQUITY_HORIZON_YEARS, DEFAULT_BLOCK_TIME_SECONDS,
    DEFAULT_CHALLENGE_TTL_SECONDS, DEFAULT_EPOCH_SLOTS, DEFAULT_GENESIS_TIMESTAMP,
    DEFAULT_GOSSIP_INTERVAL_SECONDS, DEFAULT_MIN_WITHDRAWAL_URTC, DEFAULT_PER_EPOCH_POT_URTC,
    DEFAULT_SETTLEMENT_INTERVAL_SECONDS, DEFAULT_WITHDRAWAL_FEE_URTC,
    MESSAGE_EXPIRY_SECONDS, MIN_SETTLEMENT_INTERVAL_SECONDS, PENDING_TRANSFER_CONFIRM_DELAY_SECONDS,
    PENDING_TRANSFER_THRESHOLD_URTC, PEER_REQUEST_TIMEOUT_SECONDS,
};
use rustchain_crypto::ed25519::RcSigner;
use rustchain_epoch::{settle_due_epochs, ChainClock};
use rustchain_http::state::{AppState, ConfigSnapshot};
use rustchain_ledger::{LedgerConfig, LedgerService};
use rustchain_p2p::{P2pConfig, P2pNetwork};
use rustchain_storage::{EpochRepo, LedgerRepo, StateDb};

#[derive(Parser, Debug)]
#[command(
    name = "rustchain-node",
    version,
    about = "RustChain full node — Proof of Antiquity for vintage hardware"
)]
struct Args {
    /// HTTP listen address.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Build the peer map from `RC_PEERS` — comma-separated `node_id=base_url`
/// pairs. Absent or malformed entries are skipped rather than rejected at
/// boot; an empty map just means this node gossips with nobody.
fn parse_peers(spec: &str) -> std::collections::HashMap<String, String> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .map(|(id, url)| (id.to_string(), url.to_string()))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rustchain=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("rustchain node starting");

    // ── Runtime environment & guardrails ─────────────────────────────────────
    let runtime_env = env_string("RC_RUNTIME_ENV", "production");
    let allow_mock_signature = std::env::var("RC_ALLOW_MOCK_SIGNATURE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if allow_mock_signature && runtime_env != "test" {
        anyhow::bail!(
            "RC_ALLOW_MOCK_SIGNATURE is set but RC_RUNTIME_ENV={runtime_env:?}; \
             the mock-signature shortcut may only be armed when RC_RUNTIME_ENV=test"
        );
    }

    // ── State database ────────────────────────────────────────────────────────
    let db_path = std::env::var("RUSTCHAIN_DB_PATH").unwrap_or_else(|_| ":memory:".to_string());
    let db = Arc::new(if db_path == ":memory:" {
        StateDb::open_in_memory().context("opening in-memory state database")?
    } else {
        let path = PathBuf::from(&db_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating db directory {}", parent.display()))?;
            }
        }
        StateDb::open(&path).with_context(|| format!("opening state database at {db_path}"))?
    });

    // ── Chain clock & admin key ──────────────────────────────────────────────
    let chain_clock = ChainClock {
        genesis_timestamp: env_i64("GENESIS_TIMESTAMP", DEFAULT_GENESIS_TIMESTAMP),
        block_time_seconds: env_i64("BLOCK_TIME_SECONDS", DEFAULT_BLOCK_TIME_SECONDS),
        epoch_slots: env_u64("EPOCH_SLOTS", DEFAULT_EPOCH_SLOTS),
    };
    let epoch_pot_urtc = env_u64("PER_EPOCH_POT_URTC", DEFAULT_PER_EPOCH_POT_URTC);

    let admin_key = std::env::var("RC_ADMIN_KEY").unwrap_or_default();
    if admin_key.is_empty() {
        warn!("RC_ADMIN_KEY is not set — admin routes are effectively unreachable");
    }

    // ── Attestation service ───────────────────────────────────────────────────
    let attest_config = AttestConfig {
        challenge_ttl_seconds: env_i64("RC_CHALLENGE_TTL_SECONDS", DEFAULT_CHALLENGE_TTL_SECONDS),
        chain_clock,
        antiquity_horizon_years: env_f64("RC_ANTIQUITY_HORIZON_YEARS", DEFAULT_ANTIQUITY_HORIZON_YEARS),
        runtime_env: runtime_env.clone(),
        allow_mock_signature,
    };
    let attest = Arc::new(AttestService::new(Arc::clone(&db), attest_config));

    // ── Ledger service ────────────────────────────────────────────────────────
    let ledger_config = LedgerConfig {
        withdrawal_fee_urtc: env_u64("WITHDRAWAL_FEE_URTC", DEFAULT_WITHDRAWAL_FEE_URTC),
        min_withdrawal_urtc: env_u64("MIN_WITHDRAWAL_URTC", DEFAULT_MIN_WITHDRAWAL_URTC),
        pending_threshold_urtc: env_u64("RC_PENDING_THRESHOLD_URTC", PENDING_TRANSFER_THRESHOLD_URTC),
        pending_confirm_delay_seconds: env_i64(
            "RC_PENDING_CONFIRM_DELAY_SECONDS",
            PENDING_TRANSFER_CONFIRM_DELAY_SECONDS,
        ),
        fee_pool_address: env_string("RC_FEE_POOL_ADDRESS", "RTC0000000000000000000000000000000000000fee"),
    };
    let ledger = Arc::new(LedgerService::new(Arc::clone(&db), ledger_config.clone()));

    // ── P2P network ───────────────────────────────────────────────────────────
    let node_id = env_string("RC_NODE_ID", "node-0");
    let signer = Arc::new(RcSigner::generate());
    let p2p_config = P2pConfig {
        self_node_id: node_id.clone(),
        peers: parse_peers(&env_string("RC_PEERS", "")),
        gossip_interval_seconds: env_u64("RC_GOSSIP_INTERVAL_SECONDS", DEFAULT_GOSSIP_INTERVAL_SECONDS),
        message_expiry_seconds: env_i64("RC_MESSAGE_EXPIRY_SECONDS", MESSAGE_EXPIRY_SECONDS),
        peer_request_timeout_seconds: env_u64(
            "RC_PEER_REQUEST_TIMEOUT_SECONDS",
            PEER_REQUEST_TIMEOUT_SECONDS,
        ),
    };
    info!(node_id = %node_id, peers = p2p_config.peers.len(), "p2p identity");
    let p2p = Arc::new(P2pNetwork::new(Arc::clone(&db), p2p_config, signer));

    // ── Shared app state ──────────────────────────────────────────────────────
    let config_snapshot = Arc::new(ConfigSnapshot {
        genesis_timestamp: chain_clock.genesis_timestamp,
        block_time_seconds: chain_clock.block_time_seconds,
        epoch_slots: chain_clock.epoch_slots,
        per_epoch_pot_urtc: epoch_pot_urtc,
        antiquity_horizon_years: env_f64("RC_ANTIQUITY_HORIZON_YEARS", DEFAULT_ANTIQUITY_HORIZON_YEARS),
        withdrawal_fee_urtc: ledger_config.withdrawal_fee_urtc,
        min_withdrawal_urtc: ledger_config.min_withdrawal_urtc,
        pending_threshold_urtc: ledger_config.pending_threshold_urtc,
        pending_confirm_delay_seconds: ledger_config.pending_confirm_delay_seconds,
        runtime_env: runtime_env.clone(),
    });

    let started_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64;

    let state = AppState {
        db: Arc::clone(&db),
        attest,
        ledger: Arc::clone(&ledger),
        p2p: Arc::clone(&p2p),
        chain_clock,
        epoch_pot_urtc,
        admin_key,
        admin_limiter: Arc::new(rustchain_attest::RateLimiter::new(ADMIN_RATE_LIMIT_PER_MINUTE, 60)),
        trusted_proxies: rustchain_http::net::TrustedProxies::parse(&env_string("RC_TRUSTED_PROXIES", "")),
        started_at,
        config_snapshot,
    };

    // ── Settlement ticker ─────────────────────────────────────────────────────
    let settlement_interval = env_u64(
        "RC_SETTLEMENT_INTERVAL_SECONDS",
        DEFAULT_SETTLEMENT_INTERVAL_SECONDS,
    )
    .max(MIN_SETTLEMENT_INTERVAL_SECONDS);
    {
        let db = Arc::clone(&db);
        let chain_clock = state.chain_clock;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(settlement_interval));
            loop {
                ticker.tick().await;
                let now = crate::now_unix();
                let repo = EpochRepo::new(&db);
                let ledger_repo = LedgerRepo::new(&db);
                let current_epoch = chain_clock.current_epoch(now);
                match settle_due_epochs(&repo, &ledger_repo, current_epoch, epoch_pot_urtc, now) {
                    Ok(count) if count > 0 => info!(count, "settled epochs"),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "settlement tick failed"),
                }
            }
        });
    }

    // ── P2P gossip ticker ─────────────────────────────────────────────────────
    tokio::spawn(Arc::clone(&p2p).run());

    // ── HTTP server ───────────────────────────────────────────────────────────
    let router = rustchain_http::build_router(state);
    info!(addr = %args.listen, "serving http");
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("http server error")?;

    Ok(())
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64
}
