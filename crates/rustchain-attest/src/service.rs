use std::sync::Arc;

use rand::RngCore;
use serde_json::Value;
use tracing::{info, warn};

use rustchain_core::error::RcError;
use rustchain_core::types::AntiquityTier;
use rustchain_crypto::ed25519::verify_signature;
use rustchain_crypto::hash::{challenge_commitment, hardware_id};
use rustchain_epoch::{enrollment_weight, ChainClock};
use rustchain_storage::{AttestationRow, EpochRepo, MinerRepo, StateDb};

use crate::rate_limit::RateLimiter;
use crate::request::SubmitRequest;

/// Runtime-tunable parameters for the attestation gate, one instance
/// shared across all requests.
#[derive(Debug, Clone)]
pub struct AttestConfig {
    pub challenge_ttl_seconds: i64,
    pub chain_clock: ChainClock,
    pub antiquity_horizon_years: f64,
    /// Only `"test"` may enable a mock-signature shortcut; the node refuses
    /// to boot with that shortcut enabled in any other runtime env.
    pub runtime_env: String,
    pub allow_mock_signature: bool,
}

pub struct AttestService {
    db: Arc<StateDb>,
    config: AttestConfig,
    ip_limiter: RateLimiter,
    miner_limiter: RateLimiter,
}

#[derive(Debug, Clone)]
pub struct ChallengeResponse {
    pub nonce: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub miner: String,
    pub antiquity_tier: AntiquityTier,
    pub antiquity_multiplier: f64,
    pub entropy_score: f64,
    pub arch_validation_score: f64,
    pub epoch: u64,
}

impl AttestService {
    pub fn new(db: Arc<StateDb>, config: AttestConfig) -> Self {
        Self {
            db,
            ip_limiter: RateLimiter::new(
                rustchain_core::constants::ATTEST_SUBMIT_IP_LIMIT_PER_MINUTE,
                60,
            ),
            miner_limiter: RateLimiter::new(1, rustchain_core::constants::ATTEST_SUBMIT_MINER_WINDOW_SECONDS as i64),
            config,
        }
    }

    pub fn issue_challenge(
        &self,
        miner_id: Option<&str>,
        now: i64,
    ) -> Result<ChallengeResponse, RcError> {
        let mut nonce_bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce_hex = hex::encode(nonce_bytes);
        let expires_at = now + self.config.challenge_ttl_seconds;

        let repo = MinerRepo::new(&self.db);
        repo.issue_challenge(&nonce_hex, miner_id, now, expires_at)?;

        Ok(ChallengeResponse {
            nonce: nonce_hex,
            expires_at,
        })
    }

    /// The nine-step sequential gate from `/attest/submit`. First failure
    /// wins; every later step assumes all earlier steps passed.
    pub fn submit(
        &self,
        raw: &Value,
        remote_ip: &str,
        now: i64,
    ) -> Result<SubmitOutcome, RcError> {
        // Step 1: body shape.
        let req = SubmitRequest::parse(raw)?;

        let miner_repo = MinerRepo::new(&self.db);

        // Step 2: blocked wallets.
        if miner_repo.is_blocked(&req.miner)? {
            return Err(RcError::MinerBlocked);
        }

        // Step 3: rate limit.
        if self.ip_limiter.is_rate_limited(remote_ip, now) {
            return Err(RcError::RateLimitExceeded);
        }
        if self.miner_limiter.is_rate_limited(&req.miner, now) {
            return Err(RcError::RateLimitExceeded);
        }

        // Step 4: nonce freshness — consume the issued challenge atomically.
        let challenge = miner_repo
            .consume_challenge(&req.nonce, now)?
            .ok_or(RcError::ChallengeInvalid)?;
        let _ = challenge;

        // Step 5: nonce replay.
        let replay_expiry = now + self.config.challenge_ttl_seconds * 4;
        if !miner_repo.mark_nonce_used(&req.miner, &req.nonce, replay_expiry)? {
            return Err(RcError::NonceReplay);
        }

        // Step 6: hardware binding.
        let first_mac = req.signals.macs.first().map(String::as_str).unwrap_or("");
        let serial = req.device.serial.as_deref().unwrap_or("");
        let hw_id = hardware_id(&req.device.model, &req.device.arch, &req.device.family, serial, first_mac);
        let enrolled_public_key = match miner_repo.hardware_binding(&hw_id)? {
            Some((bound_miner, _)) if bound_miner != req.miner => {
                return Err(RcError::HardwareBound);
            }
            Some((_, public_key)) => public_key,
            None => {
                miner_repo.bind_hardware(&hw_id, &req.miner, now, req.public_key.as_deref())?;
                req.public_key.clone()
            }
        };

        // Step 7: fingerprint validation.
        let outcome = rustchain_fingerprint::validate(&req.device.family, &req.device.cpu, &req.fingerprint);
        if !outcome.passed {
            return Err(reason_to_error(&outcome.reason));
        }

        // Step 8: signature, if provided.
        if let Some(signature_hex) = &req.signature {
            self.verify_attestation_signature(&req, signature_hex, enrolled_public_key.as_deref())?;
        }

        // Step 9: commit.
        let multiplier = enrollment_weight(
            outcome.antiquity_tier,
            self.config.chain_clock.genesis_timestamp,
            now,
            self.config.antiquity_horizon_years,
        );
        let row = AttestationRow {
            miner_id: req.miner.clone(),
            hardware_id: Some(hw_id),
            device_arch: req.device.arch.clone(),
            device_family: req.device.family.clone(),
            entropy_score: outcome.entropy_score,
            arch_validation_score: outcome.arch_validation_score,
            antiquity_tier: outcome.antiquity_tier.to_string(),
            antiquity_multiplier: multiplier,
            mac_observations: req.signals.macs.clone(),
            hostname: req.signals.hostname.clone(),
            ts_ok: now,
        };
        miner_repo.upsert_attestation(&row)?;

        let epoch = self.config.chain_clock.current_epoch(now);
        let epoch_repo = EpochRepo::new(&self.db);
        epoch_repo.enroll(epoch, &req.miner, multiplier)?;

        info!(
            miner = %req.miner,
            tier = %outcome.antiquity_tier,
            multiplier,
            epoch,
            "attestation accepted"
        );

        Ok(SubmitOutcome {
            miner: req.miner,
            antiquity_tier: outcome.antiquity_tier,
            antiquity_multiplier: multiplier,
            entropy_score: outcome.entropy_score,
            arch_validation_score: outcome.arch_validation_score,
            epoch,
        })
    }

    fn verify_attestation_signature(
        &self,
        req: &SubmitRequest,
        signature_hex: &str,
        enrolled_public_key: Option<&str>,
    ) -> Result<(), RcError> {
        if self.config.allow_mock_signature {
            if self.config.runtime_env != "test" {
                // Should never happen — the node refuses to boot with this
                // combination. Defensive check kept here too.
                warn!("mock signature shortcut enabled outside test runtime env");
                return Err(RcError::InvalidSignature);
            }
            return Ok(());
        }

        let public_key_hex = enrolled_public_key.ok_or(RcError::InvalidSignature)?;
        let public_key = hex::decode(public_key_hex).map_err(|_| RcError::InvalidSignature)?;
        let signature = hex::decode(signature_hex).map_err(|_| RcError::InvalidSignature)?;
        let message = challenge_commitment(&req.nonce, &req.miner, req.miner_id.as_deref().unwrap_or(""));
        verify_signature(&public_key, &message, &signature).map_err(|_| RcError::InvalidSignature)
    }
}

fn reason_to_error(reason: &str) -> RcError {
    if let Some(rest) = reason.strip_prefix("vm_detected:") {
        return RcError::VmDetected(rest.to_string());
    }
    if let Some(rest) = reason.strip_prefix("clock_drift_failed:") {
        return RcError::ClockDriftFailed(rest.to_string());
    }
    match reason {
        "anti_emulation_no_evidence" => RcError::AntiEmulationNoEvidence,
        "timing_too_uniform" => RcError::TimingTooUniform,
        "vintage_timing_too_stable" => RcError::VintageTimingTooStable,
        "flat_cache_hierarchy" => RcError::FlatCacheHierarchy,
        "missing_expected_simd" => RcError::MissingExpectedSimd,
        "thermal_drift_failed" => RcError::ClockDriftFailed("thermal".to_string()),
        "frozen_profile" => RcError::FrozenProfile,
        "known_emulator_rom" => RcError::KnownEmulatorRom,
        "device_age_oracle_mismatch" => RcError::DeviceAgeOracleMismatch { confidence: 0.95 },
        other => RcError::Other(format!("fingerprint rejected: {other}")),
    }
}
