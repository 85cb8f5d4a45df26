use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A single fingerprint check result. Accepts either a bare boolean
/// (legacy shape) or `{passed, data}`. Any other shape is treated as a
/// failed check with no evidence rather than a parse error — the
/// validator must never 500 on adversarial input.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub data: Value,
}

impl CheckResult {
    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn data_str_array(&self, key: &str) -> Vec<String> {
        self.data
            .get(key)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_evidence(&self) -> bool {
        match &self.data {
            Value::Null => false,
            Value::Object(m) => !m.is_empty(),
            Value::Array(a) => !a.is_empty(),
            _ => true,
        }
    }
}

impl<'de> Deserialize<'de> for CheckResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(match raw {
            Value::Bool(b) => CheckResult {
                passed: b,
                data: Value::Null,
            },
            Value::Object(ref map) => {
                let passed = map.get("passed").and_then(Value::as_bool).unwrap_or(false);
                let data = map.get("data").cloned().unwrap_or(Value::Null);
                CheckResult { passed, data }
            }
            _ => CheckResult {
                passed: false,
                data: Value::Null,
            },
        })
    }
}

/// The permissive, tagged-variant fingerprint payload. A missing field is
/// "not provided" (legacy-permissive); a present-but-failing check is
/// fatal. Unknown JSON keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FingerprintChecks {
    #[serde(default)]
    pub anti_emulation: Option<CheckResult>,
    #[serde(default)]
    pub clock_drift: Option<CheckResult>,
    #[serde(default)]
    pub cache_timing: Option<CheckResult>,
    #[serde(default)]
    pub simd_identity: Option<CheckResult>,
    #[serde(default)]
    pub thermal_drift: Option<CheckResult>,
    #[serde(default)]
    pub rom_fingerprint: Option<CheckResult>,
    #[serde(default)]
    pub device_age_oracle: Option<CheckResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_legacy_bool_shape() {
        let v: FingerprintChecks = serde_json::from_str(r#"{"anti_emulation": true}"#).unwrap();
        assert!(v.anti_emulation.unwrap().passed);
    }

    #[test]
    fn accepts_full_object_shape() {
        let v: FingerprintChecks =
            serde_json::from_str(r#"{"clock_drift": {"passed": false, "data": {"cv": 0.0}}}"#)
                .unwrap();
        let cd = v.clock_drift.unwrap();
        assert!(!cd.passed);
        assert_eq!(cd.data_f64("cv"), Some(0.0));
    }

    #[test]
    fn missing_check_is_none() {
        let v: FingerprintChecks = serde_json::from_str(r#"{}"#).unwrap();
        assert!(v.anti_emulation.is_none());
    }

    #[test]
    fn unknown_keys_ignored() {
        let v: FingerprintChecks =
            serde_json::from_str(r#"{"anti_emulation": true, "something_new": 42}"#).unwrap();
        assert!(v.anti_emulation.unwrap().passed);
    }
}
