//! ─── RustChain Node Constants ───────────────────────────────────────────────
//!
//! "Consensus that rewards survival, not silicon."
//!
//! Unit:   uRTC (micro-RTC)
//! Ticker: RTC

use crate::types::AntiquityTier;

// ── Unit conversion ───────────────────────────────────────────────────────────

/// 1 RTC expressed in uRTC.
pub const URTC_PER_RTC: u64 = 1_000_000;

// ── Chain clock ───────────────────────────────────────────────────────────────

/// Default genesis timestamp (Unix seconds UTC). Overridable via the
/// `GENESIS_TIMESTAMP` environment variable; fixed per deployment thereafter.
pub const DEFAULT_GENESIS_TIMESTAMP: i64 = 1_728_000_000;

/// Seconds per slot.
pub const DEFAULT_BLOCK_TIME_SECONDS: i64 = 600;

/// Slots per epoch (~24h at the default block time).
pub const DEFAULT_EPOCH_SLOTS: u64 = 144;

// ── Epoch settlement ──────────────────────────────────────────────────────────

/// Fixed per-epoch reward pot (uRTC). Overridable via `PER_EPOCH_POT_URTC`.
pub const DEFAULT_PER_EPOCH_POT_URTC: u64 = 1_500_000;

/// Settlement worker tick cadence (seconds). Must be >= this floor.
pub const MIN_SETTLEMENT_INTERVAL_SECONDS: u64 = 300;

/// Default settlement worker tick cadence (seconds).
pub const DEFAULT_SETTLEMENT_INTERVAL_SECONDS: u64 = 300;

/// Horizon (years from genesis) at which the time-aged bonus decays to 1.0.
pub const DEFAULT_ANTIQUITY_HORIZON_YEARS: f64 = 20.0;

// ── Antiquity multiplier table (authoritative; spec §4.3) ────────────────────

pub const MULTIPLIER_ANCIENT: f64 = 3.0;
pub const MULTIPLIER_CLASSIC: f64 = 1.5;
pub const MULTIPLIER_VINTAGE: f64 = 1.2;
pub const MULTIPLIER_MODERN: f64 = 1.0;
pub const MULTIPLIER_EMULATED: f64 = 0.03125; // 1/32 — the 32x emulation penalty

pub fn base_multiplier(tier: AntiquityTier) -> f64 {
    match tier {
        AntiquityTier::Ancient => MULTIPLIER_ANCIENT,
        AntiquityTier::Classic => MULTIPLIER_CLASSIC,
        AntiquityTier::Vintage => MULTIPLIER_VINTAGE,
        AntiquityTier::Modern => MULTIPLIER_MODERN,
        AntiquityTier::Emulated => MULTIPLIER_EMULATED,
    }
}

// ── Attestation ────────────────────────────────────────────────────────────────

/// Challenge nonce time-to-live (seconds).
pub const DEFAULT_CHALLENGE_TTL_SECONDS: i64 = 120;

/// TTL for a `miner_attest_recent` row to count as "recent" in `/api/miners`.
pub const ATTESTATION_RECENT_TTL_SECONDS: i64 = 24 * 3600;

/// Per-miner submit rate limit window (seconds) — 1 submit per window.
pub const ATTEST_SUBMIT_MINER_WINDOW_SECONDS: u64 = 60;

/// Per-IP submit rate limit (requests per 60s window).
pub const ATTEST_SUBMIT_IP_LIMIT_PER_MINUTE: u32 = 30;

/// Generic admin-route rate limit (requests per 60s window).
pub const ADMIN_RATE_LIMIT_PER_MINUTE: u32 = 10;

/// Clock-drift coefficient of variation below which timing is "too uniform"
/// to be genuine (an emulator signature).
pub const CLOCK_DRIFT_CV_EMULATOR_FLOOR: f64 = 1e-4;

/// Minimum clock-drift CV expected on vintage (G3/G4/G5) architectures.
pub const CLOCK_DRIFT_CV_VINTAGE_FLOOR: f64 = 1e-3;

/// Minimum L2/L1 latency ratio for architectures with a real L2 cache.
pub const CACHE_L2_L1_MIN_RATIO: f64 = 1.05;

// ── Ledger / wallet ────────────────────────────────────────────────────────────

/// Default minimum withdrawal amount (uRTC).
pub const DEFAULT_MIN_WITHDRAWAL_URTC: u64 = 10_000; // 0.01 RTC

/// Default withdrawal fee (uRTC). Ordinary transfers are not fee-bearing —
/// only withdrawals are.
pub const DEFAULT_WITHDRAWAL_FEE_URTC: u64 = 10_000; // 0.01 RTC

/// Transfer size (uRTC) above which a transfer is held `pending` instead of
/// executing immediately.
pub const PENDING_TRANSFER_THRESHOLD_URTC: u64 = 100 * URTC_PER_RTC;

/// Delay before a pending transfer matures and can be confirmed (seconds).
pub const PENDING_TRANSFER_CONFIRM_DELAY_SECONDS: i64 = 3600;

// ── P2P sync ───────────────────────────────────────────────────────────────────

/// Gossip tick cadence (seconds).
pub const DEFAULT_GOSSIP_INTERVAL_SECONDS: u64 = 30;

/// Gossip envelope expiry (seconds); older envelopes are dropped from the
/// dedup cache and ignored.
pub const MESSAGE_EXPIRY_SECONDS: i64 = 300;

/// Peer HTTP request timeout (seconds); gossip never blocks request handling.
pub const PEER_REQUEST_TIMEOUT_SECONDS: u64 = 15;

// ── HTTP surface ───────────────────────────────────────────────────────────────

/// Server-wide request deadline (seconds).
pub const REQUEST_DEADLINE_SECONDS: u64 = 30;

/// Per-statement DB transaction timeout (seconds, advisory — enforced via
/// `busy_timeout`).
pub const DB_STATEMENT_TIMEOUT_SECONDS: u64 = 5;
