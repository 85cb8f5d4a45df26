//! CPU brand-string → release-year heuristics, used by fingerprint rule 7
//! (the device-age oracle). A claimed architecture family that could not
//! plausibly have produced the reported brand string (e.g. PowerPC claimed
//! on an Intel/AMD-shaped string) is a hard mismatch.

/// Parse an Intel "Core" generation number out of a model string like
/// `i7-4770` or `i7-1165G7`. Four-digit model numbers encode the
/// generation as the leading one or two digits (gen 10+ uses two).
fn intel_core_year(model: &str) -> Option<i32> {
    let digits: String = model.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    let gen: u32 = if digits.len() >= 5 {
        digits[..2].parse().ok()?
    } else {
        digits[..1].parse().ok()?
    };
    let year = match gen {
        1 => 2010,
        2 => 2011,
        3 => 2012,
        4 => 2013,
        5 => 2015,
        6 => 2015,
        7 => 2017,
        8 => 2017,
        9 => 2018,
        10 => 2020,
        11 => 2021,
        12 => 2021,
        13 => 2022,
        14 => 2023,
        _ => return None,
    };
    Some(year)
}

fn apple_silicon_year(brand: &str) -> Option<i32> {
    let lower = brand.to_ascii_lowercase();
    if lower.contains("m1") {
        Some(2020)
    } else if lower.contains("m2") {
        Some(2022)
    } else if lower.contains("m3") {
        Some(2023)
    } else if lower.contains("m4") {
        Some(2024)
    } else {
        None
    }
}

/// Best-effort parsed year and the arch family the brand string implies.
struct ParsedBrand {
    year: Option<i32>,
    implied_family: &'static str,
}

fn parse_brand(cpu_brand: &str) -> ParsedBrand {
    let lower = cpu_brand.to_ascii_lowercase();
    if lower.contains("apple") || lower.contains(" m1") || lower.contains(" m2") {
        return ParsedBrand {
            year: apple_silicon_year(&lower),
            implied_family: "arm64",
        };
    }
    if lower.contains("intel") || lower.contains("core(tm)") || lower.contains("i3-") || lower.contains("i5-") || lower.contains("i7-") || lower.contains("i9-") {
        let year = cpu_brand
            .split_whitespace()
            .find_map(intel_core_year);
        return ParsedBrand {
            year,
            implied_family: "x86_64",
        };
    }
    if lower.contains("amd") || lower.contains("ryzen") {
        return ParsedBrand {
            year: None,
            implied_family: "x86_64",
        };
    }
    if lower.contains("powerpc") || lower.contains("ppc") || lower.contains("g3") || lower.contains("g4") || lower.contains("g5") {
        return ParsedBrand {
            year: None,
            implied_family: "ppc",
        };
    }
    ParsedBrand {
        year: None,
        implied_family: "unknown",
    }
}

/// Outcome of the device-age oracle check.
pub struct AgeOracleResult {
    pub mismatch: bool,
    pub confidence: f64,
}

/// Compare the claimed architecture family against what the reported CPU
/// brand string implies. A claimed `ppc` family backed by an x86/ARM-shaped
/// brand string (or vice versa) is a hard mismatch at high confidence.
pub fn check_device_age_oracle(claimed_family: &str, cpu_brand: &str) -> AgeOracleResult {
    let claimed = normalize_family(claimed_family);
    let parsed = parse_brand(cpu_brand);

    if parsed.implied_family == "unknown" {
        return AgeOracleResult {
            mismatch: false,
            confidence: 0.0,
        };
    }

    if claimed != parsed.implied_family {
        return AgeOracleResult {
            mismatch: true,
            confidence: 0.95,
        };
    }

    AgeOracleResult {
        mismatch: false,
        confidence: if parsed.year.is_some() { 0.8 } else { 0.3 },
    }
}

fn normalize_family(family: &str) -> &'static str {
    match family.to_ascii_lowercase().as_str() {
        "g3" | "g4" | "g5" | "ppc" | "powerpc" => "ppc",
        "arm" | "arm64" | "aarch64" => "arm64",
        "x86" | "x86_64" => "x86_64",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intel_gen4_maps_to_2013() {
        assert_eq!(intel_core_year("i7-4770"), Some(2013));
    }

    #[test]
    fn intel_gen11_maps_to_2021() {
        assert_eq!(intel_core_year("i7-1165G7"), Some(2021));
    }

    #[test]
    fn apple_m2_maps_to_2022() {
        assert_eq!(apple_silicon_year("Apple M2"), Some(2022));
    }

    #[test]
    fn powerpc_claimed_on_x86_brand_is_mismatch() {
        let result = check_device_age_oracle("g4", "Intel(R) Core(TM) i7-4770 CPU");
        assert!(result.mismatch);
        assert!(result.confidence > 0.9);
    }

    #[test]
    fn matching_family_is_not_a_mismatch() {
        let result = check_device_age_oracle("x86_64", "Intel(R) Core(TM) i7-4770 CPU");
        assert!(!result.mismatch);
    }

    #[test]
    fn unrecognized_brand_is_not_penalized() {
        let result = check_device_age_oracle("g4", "Generic Virtual CPU");
        assert!(!result.mismatch);
    }
}
