use rustchain_core::types::AntiquityTier;

use crate::arch_profiles::profile_for;
use crate::checks::FingerprintChecks;
use crate::device_age::check_device_age_oracle;

/// Known emulator ROM hashes for retro platforms. A reported ROM hash
/// matching one of these is conclusive evidence of emulation.
const KNOWN_EMULATOR_ROMS: &[&str] = &[
    "e6fa06d9d8e2976452a5b47687451c2d54699921041a07e6cfaa2904a28a5da",
    "0c1a4c84e87bd6cbc6a66c7e9d9b1f0f79c5bb35e7b2e13d9e7e0f2d1a8b5b2e",
];

/// Outcome of a full fingerprint validation pass.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub reason: String,
    pub entropy_score: f64,
    pub arch_validation_score: f64,
    pub antiquity_tier: AntiquityTier,
}

fn reject(reason: impl Into<String>) -> ValidationOutcome {
    ValidationOutcome {
        passed: false,
        reason: reason.into(),
        entropy_score: 0.0,
        arch_validation_score: 0.0,
        antiquity_tier: AntiquityTier::Emulated,
    }
}

/// Run all seven fingerprint rules against a reported device and its
/// checks. `device_family` drives the expected-SIMD/vintage-floor tables;
/// `cpu_brand` feeds the device-age oracle.
pub fn validate(
    device_family: &str,
    cpu_brand: &str,
    checks: &FingerprintChecks,
) -> ValidationOutcome {
    let profile = profile_for(device_family);
    let mut entropy_score: f64 = 0.0;
    let mut arch_validation_score: f64 = 0.0;
    let mut signals = 0u32;

    // Rule 1: anti-emulation.
    if let Some(check) = &checks.anti_emulation {
        if !check.passed {
            let indicators = check.data_str_array("vm_indicators").join(",");
            return reject(format!("vm_detected:{indicators}"));
        }
        if !check.has_evidence() {
            return reject("anti_emulation_no_evidence");
        }
        entropy_score += 0.2;
        signals += 1;
    }

    // Rule 2: clock drift.
    if let Some(check) = &checks.clock_drift {
        if !check.passed {
            let reason = check.data_str("reason").unwrap_or("unknown");
            return reject(format!("clock_drift_failed:{reason}"));
        }
        if let Some(cv) = check.data_f64("cv") {
            if cv > 0.0 && cv < rustchain_core::constants::CLOCK_DRIFT_CV_EMULATOR_FLOOR {
                return reject("timing_too_uniform");
            }
            if profile.is_vintage && cv < rustchain_core::constants::CLOCK_DRIFT_CV_VINTAGE_FLOOR {
                return reject("vintage_timing_too_stable");
            }
        }
        entropy_score += 0.2;
        arch_validation_score += 0.15;
        signals += 1;
    }

    // Rule 3: cache timing.
    if let Some(check) = &checks.cache_timing {
        if profile.has_l2 {
            let l2_l1 = check.data_f64("l2_l1_ratio").unwrap_or(0.0);
            if l2_l1 < rustchain_core::constants::CACHE_L2_L1_MIN_RATIO {
                return reject("flat_cache_hierarchy");
            }
        }
        entropy_score += 0.15;
        arch_validation_score += 0.2;
        signals += 1;
    }

    // Rule 4: SIMD identity.
    if let Some(check) = &checks.simd_identity {
        if let Some(expected) = profile.expected_simd {
            let observed = check.data_str("simd").unwrap_or("");
            if !observed.eq_ignore_ascii_case(expected) {
                return reject("missing_expected_simd");
            }
        }
        arch_validation_score += 0.25;
        signals += 1;
    }

    // Rule 5: thermal drift.
    if let Some(check) = &checks.thermal_drift {
        if !check.passed {
            return reject("thermal_drift_failed");
        }
        if let Some(variance) = check.data_f64("variance") {
            if variance == 0.0 {
                return reject("frozen_profile");
            }
        }
        entropy_score += 0.15;
        signals += 1;
    }

    // Rule 6: ROM / vendor fingerprint (retro platforms only).
    if let Some(check) = &checks.rom_fingerprint {
        if let Some(rom_hash) = check.data_str("rom_hash") {
            if KNOWN_EMULATOR_ROMS.contains(&rom_hash) {
                return reject("known_emulator_rom");
            }
        }
        arch_validation_score += 0.1;
        signals += 1;
    }

    // Rule 7: device-age oracle. Runs against the reported brand string
    // regardless of whether the miner's own fingerprint payload carries a
    // `device_age_oracle` check — the node computes this one itself.
    let oracle = check_device_age_oracle(device_family, cpu_brand);
    if oracle.mismatch && oracle.confidence > 0.8 {
        return reject("device_age_oracle_mismatch");
    }
    if checks.device_age_oracle.is_some() {
        signals += 1;
    }
    arch_validation_score += 0.1 * oracle.confidence;

    if signals == 0 {
        return reject("no_checks_provided");
    }

    entropy_score = entropy_score.min(1.0);
    arch_validation_score = arch_validation_score.min(1.0);

    let tier = classify_tier(device_family, &profile, oracle.mismatch);

    ValidationOutcome {
        passed: true,
        reason: "ok".to_string(),
        entropy_score,
        arch_validation_score,
        antiquity_tier: tier,
    }
}

fn classify_tier(
    device_family: &str,
    profile: &crate::arch_profiles::ArchProfile,
    oracle_mismatch: bool,
) -> AntiquityTier {
    if oracle_mismatch {
        return AntiquityTier::Emulated;
    }
    match device_family.to_ascii_lowercase().as_str() {
        "g3" => AntiquityTier::Ancient,
        "g4" | "g5" => AntiquityTier::Classic,
        _ if profile.is_vintage => AntiquityTier::Vintage,
        _ => AntiquityTier::Modern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn checks_from(value: serde_json::Value) -> FingerprintChecks {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn vm_detected_is_fatal() {
        let checks = checks_from(json!({
            "anti_emulation": {"passed": false, "data": {"vm_indicators": ["kvm"]}}
        }));
        let outcome = validate("x86_64", "Intel(R) Core(TM) i7-4770 CPU", &checks);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "vm_detected:kvm");
    }

    #[test]
    fn anti_emulation_passed_without_evidence_rejected() {
        let checks = checks_from(json!({"anti_emulation": {"passed": true, "data": {}}}));
        let outcome = validate("x86_64", "Intel(R) Core(TM) i7-4770 CPU", &checks);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "anti_emulation_no_evidence");
    }

    #[test]
    fn clock_drift_too_uniform_is_rejected() {
        let checks = checks_from(json!({
            "clock_drift": {"passed": true, "data": {"cv": 0.00001}}
        }));
        let outcome = validate("x86_64", "Intel(R) Core(TM) i7-4770 CPU", &checks);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "timing_too_uniform");
    }

    #[test]
    fn vintage_arch_requires_higher_drift_floor() {
        let checks = checks_from(json!({
            "clock_drift": {"passed": true, "data": {"cv": 0.0005}}
        }));
        let outcome = validate("g4", "PowerPC 7447A", &checks);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "vintage_timing_too_stable");
    }

    #[test]
    fn missing_altivec_on_g4_is_rejected() {
        let checks = checks_from(json!({
            "simd_identity": {"passed": true, "data": {"simd": "sse"}}
        }));
        let outcome = validate("g4", "PowerPC 7447A", &checks);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "missing_expected_simd");
    }

    #[test]
    fn frozen_thermal_profile_is_rejected() {
        let checks = checks_from(json!({
            "thermal_drift": {"passed": true, "data": {"variance": 0.0}}
        }));
        let outcome = validate("x86_64", "Intel(R) Core(TM) i7-4770 CPU", &checks);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "frozen_profile");
    }

    #[test]
    fn device_age_mismatch_rejected() {
        let checks = checks_from(json!({"anti_emulation": {"passed": true, "data": {"ok": true}}}));
        let outcome = validate("g4", "Intel(R) Core(TM) i7-4770 CPU", &checks);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "device_age_oracle_mismatch");
    }

    #[test]
    fn well_formed_vintage_report_passes_and_tiers_classic() {
        let checks = checks_from(json!({
            "anti_emulation": {"passed": true, "data": {"ok": true}},
            "clock_drift": {"passed": true, "data": {"cv": 0.01}},
            "cache_timing": {"passed": true, "data": {"l2_l1_ratio": 1.2}},
            "simd_identity": {"passed": true, "data": {"simd": "altivec"}},
            "thermal_drift": {"passed": true, "data": {"variance": 0.3}}
        }));
        let outcome = validate("g4", "PowerPC 7447A", &checks);
        assert!(outcome.passed);
        assert_eq!(outcome.antiquity_tier, AntiquityTier::Classic);
    }

    #[test]
    fn no_checks_provided_is_rejected() {
        let checks = checks_from(json!({}));
        let outcome = validate("x86_64", "Intel(R) Core(TM) i7-4770 CPU", &checks);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "no_checks_provided");
    }
}
