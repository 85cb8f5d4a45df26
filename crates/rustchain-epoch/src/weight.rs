use rustchain_core::constants::base_multiplier;
use rustchain_core::types::{AntiquityTier, Timestamp};

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Linear decay from 1.0-at-genesis down to a floor of 1.0 at `horizon_years`
/// — i.e. the bonus starts above 1.0 only if `age_years` is negative, which
/// cannot happen; in practice this is a monotonically non-increasing curve
/// that never drops below 1.0, per the "decays... never drops below 1.0"
/// invariant. The curve runs from `2.0` at genesis linearly down to `1.0`
/// at the horizon.
pub fn time_aged_bonus(genesis_timestamp: Timestamp, now: Timestamp, horizon_years: f64) -> f64 {
    let age_years = ((now - genesis_timestamp).max(0) as f64) / SECONDS_PER_YEAR;
    if horizon_years <= 0.0 {
        return 1.0;
    }
    let progress = (age_years / horizon_years).clamp(0.0, 1.0);
    let bonus = 2.0 - progress;
    bonus.max(1.0)
}

/// `weight = base_multiplier(tier) * time_aged_bonus`.
pub fn enrollment_weight(
    tier: AntiquityTier,
    genesis_timestamp: Timestamp,
    now: Timestamp,
    horizon_years: f64,
) -> f64 {
    base_multiplier(tier) * time_aged_bonus(genesis_timestamp, now, horizon_years)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonus_at_genesis_is_two() {
        let bonus = time_aged_bonus(0, 0, 20.0);
        assert!((bonus - 2.0).abs() < 1e-9);
    }

    #[test]
    fn bonus_at_horizon_floors_to_one() {
        let now = (20.0 * SECONDS_PER_YEAR) as i64;
        let bonus = time_aged_bonus(0, now, 20.0);
        assert!((bonus - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bonus_never_drops_below_one_past_horizon() {
        let now = (50.0 * SECONDS_PER_YEAR) as i64;
        let bonus = time_aged_bonus(0, now, 20.0);
        assert_eq!(bonus, 1.0);
    }

    #[test]
    fn enrollment_weight_scales_base_multiplier() {
        let w = enrollment_weight(AntiquityTier::Ancient, 0, 0, 20.0);
        assert!((w - 6.0).abs() < 1e-9); // 3.0 * 2.0
    }
}
