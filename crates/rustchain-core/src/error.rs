use thiserror::Error;

#[derive(Debug, Error)]
pub enum RcError {
    // ── Body shape ───────────────────────────────────────────────────────────
    #[error("request body must be a JSON object")]
    InvalidJsonObject,

    // ── Attestation errors ───────────────────────────────────────────────────
    #[error("vm detected: {0}")]
    VmDetected(String),

    #[error("anti-emulation check present but no supporting evidence")]
    AntiEmulationNoEvidence,

    #[error("clock drift check failed: {0}")]
    ClockDriftFailed(String),

    #[error("timing too uniform to be genuine hardware")]
    TimingTooUniform,

    #[error("timing too stable for claimed vintage architecture")]
    VintageTimingTooStable,

    #[error("flat cache hierarchy inconsistent with claimed architecture")]
    FlatCacheHierarchy,

    #[error("expected SIMD instruction set not reported")]
    MissingExpectedSimd,

    #[error("thermal profile frozen across repeated reports")]
    FrozenProfile,

    #[error("ROM fingerprint matches a known emulator ROM")]
    KnownEmulatorRom,

    #[error("device age oracle mismatch (confidence {confidence:.2})")]
    DeviceAgeOracleMismatch { confidence: f64 },

    #[error("challenge nonce invalid or unknown")]
    ChallengeInvalid,

    #[error("challenge nonce expired or does not match")]
    ChallengeMismatch,

    #[error("nonce already used")]
    NonceReplay,

    #[error("nonce is stale")]
    NonceStale,

    #[error("hardware_id already bound to a different miner")]
    HardwareBound,

    #[error("miner wallet is blocked")]
    MinerBlocked,

    #[error("invalid signature")]
    InvalidSignature,

    // ── Ledger / wallet errors ───────────────────────────────────────────────
    #[error("amount is not a finite number")]
    AmountNotFinite,

    #[error("amount must be greater than zero")]
    AmountMustBePositive,

    #[error("amount too small after quantization to micro-RTC")]
    AmountTooSmallAfterQuantization,

    #[error("from and to addresses must differ")]
    FromToMustDiffer,

    #[error("invalid from_address format")]
    InvalidFromAddressFormat,

    #[error("invalid to_address format")]
    InvalidToAddressFormat,

    #[error("nonce must be an integer")]
    NonceNotInt,

    #[error("nonce must be greater than zero")]
    NonceMustBeGtZero,

    #[error("required fields missing: {0:?}")]
    MissingRequiredFields(Vec<String>),

    #[error("from_address does not match the supplied public key")]
    AddressPubkeyMismatch,

    #[error("insufficient balance: need {need} uRTC, have {have} uRTC")]
    InsufficientBalance { need: u64, have: u64 },

    #[error("amount below minimum withdrawal of {min} uRTC")]
    AmountBelowMinimumWithdrawal { min: u64 },

    #[error("unknown wallet: {0}")]
    UnknownWallet(String),

    #[error("pending transfer not found: {0}")]
    PendingTransferNotFound(String),

    // ── Auth / rate limiting ─────────────────────────────────────────────────
    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    // ── P2P ───────────────────────────────────────────────────────────────────
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("peer signature does not match pinned TOFU key")]
    PeerKeyMismatch,

    #[error("envelope payload hash mismatch")]
    EnvelopePayloadHashMismatch,

    // ── Storage / serialization ──────────────────────────────────────────────
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    // ── General ───────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl RcError {
    /// Machine-readable error code surfaced as `{error: <CODE>}` on the wire.
    pub fn error_code(&self) -> &'static str {
        match self {
            RcError::InvalidJsonObject => "INVALID_JSON_OBJECT",
            RcError::VmDetected(_) => "VM_DETECTED",
            RcError::AntiEmulationNoEvidence => "VM_DETECTED",
            RcError::ClockDriftFailed(_) => "VM_DETECTED",
            RcError::TimingTooUniform => "VM_DETECTED",
            RcError::VintageTimingTooStable => "VM_DETECTED",
            RcError::FlatCacheHierarchy => "VM_DETECTED",
            RcError::MissingExpectedSimd => "VM_DETECTED",
            RcError::FrozenProfile => "VM_DETECTED",
            RcError::KnownEmulatorRom => "VM_DETECTED",
            RcError::DeviceAgeOracleMismatch { .. } => "VM_DETECTED",
            RcError::ChallengeInvalid => "CHALLENGE_INVALID",
            RcError::ChallengeMismatch => "CHALLENGE_MISMATCH",
            RcError::NonceReplay => "NONCE_REPLAY",
            RcError::NonceStale => "NONCE_STALE",
            RcError::HardwareBound => "HARDWARE_BOUND",
            RcError::MinerBlocked => "UNAUTHORIZED",
            RcError::InvalidSignature => "INVALID_SIGNATURE",
            RcError::AmountNotFinite => "AMOUNT_NOT_FINITE",
            RcError::AmountMustBePositive => "AMOUNT_NOT_FINITE",
            RcError::AmountTooSmallAfterQuantization => "AMOUNT_TOO_SMALL",
            RcError::FromToMustDiffer => "FROM_TO_MUST_DIFFER",
            RcError::InvalidFromAddressFormat => "INVALID_JSON_OBJECT",
            RcError::InvalidToAddressFormat => "INVALID_JSON_OBJECT",
            RcError::NonceNotInt => "INVALID_JSON_OBJECT",
            RcError::NonceMustBeGtZero => "INVALID_JSON_OBJECT",
            RcError::MissingRequiredFields(_) => "INVALID_JSON_OBJECT",
            RcError::AddressPubkeyMismatch => "INVALID_SIGNATURE",
            RcError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            RcError::AmountBelowMinimumWithdrawal { .. } => "AMOUNT_TOO_SMALL",
            RcError::UnknownWallet(_) => "UNAUTHORIZED",
            RcError::PendingTransferNotFound(_) => "UNAUTHORIZED",
            RcError::Unauthorized => "UNAUTHORIZED",
            RcError::RateLimitExceeded => "RATE_LIMIT",
            RcError::UnknownPeer(_) => "UNAUTHORIZED",
            RcError::PeerKeyMismatch => "UNAUTHORIZED",
            RcError::EnvelopePayloadHashMismatch => "INVALID_JSON_OBJECT",
            RcError::Storage(_) => "INTERNAL",
            RcError::Serialization(_) => "INTERNAL",
            RcError::NotFound(_) => "NOT_FOUND",
            RcError::Other(_) => "INTERNAL",
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RcError::Unauthorized | RcError::MinerBlocked | RcError::UnknownPeer(_) | RcError::PeerKeyMismatch => 401,
            RcError::RateLimitExceeded => 429,
            RcError::NonceReplay | RcError::HardwareBound => 409,
            RcError::VmDetected(_)
            | RcError::AntiEmulationNoEvidence
            | RcError::ClockDriftFailed(_)
            | RcError::TimingTooUniform
            | RcError::VintageTimingTooStable
            | RcError::FlatCacheHierarchy
            | RcError::MissingExpectedSimd
            | RcError::FrozenProfile
            | RcError::KnownEmulatorRom
            | RcError::DeviceAgeOracleMismatch { .. } => 403,
            RcError::NotFound(_) | RcError::UnknownWallet(_) | RcError::PendingTransferNotFound(_) => 404,
            RcError::Storage(_) | RcError::Serialization(_) | RcError::Other(_) => 500,
            _ => 400,
        }
    }
}
