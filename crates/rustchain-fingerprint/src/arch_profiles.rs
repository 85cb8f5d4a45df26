/// Static per-architecture-family expectations used by the cache-timing,
/// SIMD-identity, and vintage-timing-floor rules.
#[derive(Debug, Clone, Copy)]
pub struct ArchProfile {
    pub expected_simd: Option<&'static str>,
    pub has_l2: bool,
    pub is_vintage: bool,
}

pub fn profile_for(family: &str) -> ArchProfile {
    match family.to_ascii_lowercase().as_str() {
        "g3" => ArchProfile {
            expected_simd: None,
            has_l2: true,
            is_vintage: true,
        },
        "g4" => ArchProfile {
            expected_simd: Some("altivec"),
            has_l2: true,
            is_vintage: true,
        },
        "g5" => ArchProfile {
            expected_simd: Some("altivec"),
            has_l2: true,
            is_vintage: true,
        },
        "arm" | "arm64" | "aarch64" => ArchProfile {
            expected_simd: Some("neon"),
            has_l2: true,
            is_vintage: false,
        },
        "x86" | "x86_64" => ArchProfile {
            expected_simd: Some("sse"),
            has_l2: true,
            is_vintage: false,
        },
        _ => ArchProfile {
            expected_simd: None,
            has_l2: true,
            is_vintage: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn g4_expects_altivec() {
        assert_eq!(profile_for("g4").expected_simd, Some("altivec"));
    }

    #[test]
    fn g3_has_no_expected_simd() {
        assert_eq!(profile_for("g3").expected_simd, None);
    }

    #[test]
    fn arm_expects_neon() {
        assert_eq!(profile_for("arm64").expected_simd, Some("neon"));
    }
}
