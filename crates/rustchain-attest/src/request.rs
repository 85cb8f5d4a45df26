use serde_json::Value;

use rustchain_core::error::RcError;
use rustchain_fingerprint::FingerprintChecks;

/// Reported device characteristics. Missing string fields default to an
/// empty string rather than rejecting the request — only the top-level
/// object shapes are load-bearing (§4.4 step 1).
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub family: String,
    pub arch: String,
    pub model: String,
    pub cpu: String,
    pub cores: Option<u64>,
    pub memory_gb: Option<f64>,
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SignalsInfo {
    pub macs: Vec<String>,
    pub hostname: Option<String>,
}

/// A parsed, shape-validated `/attest/submit` body. Parsing never panics
/// and never produces a 5xx — any shape violation surfaces as
/// `RcError::InvalidJsonObject`.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub miner: String,
    pub miner_id: Option<String>,
    pub nonce: String,
    pub report_commitment: Option<String>,
    pub device: DeviceInfo,
    pub signals: SignalsInfo,
    pub fingerprint: FingerprintChecks,
    pub signature: Option<String>,
    /// Hex-encoded Ed25519 public key, enrolled as this hardware's trusted
    /// signing key on first bind (§4.4 step 6). Ignored on later submissions
    /// from already-bound hardware — the enrolled key wins.
    pub public_key: Option<String>,
}

impl SubmitRequest {
    pub fn parse(raw: &Value) -> Result<Self, RcError> {
        let obj = raw.as_object().ok_or(RcError::InvalidJsonObject)?;

        let miner = obj
            .get("miner")
            .and_then(Value::as_str)
            .ok_or(RcError::InvalidJsonObject)?
            .to_string();

        let nonce = obj
            .get("nonce")
            .and_then(Value::as_str)
            .ok_or(RcError::InvalidJsonObject)?
            .to_string();

        let miner_id = obj
            .get("miner_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let signature = obj
            .get("signature")
            .and_then(Value::as_str)
            .map(str::to_string);

        let public_key = obj
            .get("public_key")
            .and_then(Value::as_str)
            .map(str::to_string);

        let report_commitment = match obj.get("report") {
            None | Some(Value::Null) => None,
            Some(Value::Object(r)) => r.get("commitment").and_then(Value::as_str).map(str::to_string),
            Some(_) => return Err(RcError::InvalidJsonObject),
        };

        let device = match obj.get("device") {
            None | Some(Value::Null) => DeviceInfo::default(),
            Some(Value::Object(d)) => DeviceInfo {
                family: d.get("family").and_then(Value::as_str).unwrap_or("").to_string(),
                arch: d.get("arch").and_then(Value::as_str).unwrap_or("").to_string(),
                model: d.get("model").and_then(Value::as_str).unwrap_or("").to_string(),
                cpu: d.get("cpu").and_then(Value::as_str).unwrap_or("").to_string(),
                cores: d.get("cores").and_then(Value::as_u64),
                memory_gb: d.get("memory_gb").and_then(Value::as_f64),
                serial: d.get("serial").and_then(Value::as_str).map(str::to_string),
            },
            Some(_) => return Err(RcError::InvalidJsonObject),
        };

        let signals = match obj.get("signals") {
            None | Some(Value::Null) => SignalsInfo::default(),
            Some(Value::Object(s)) => {
                let macs = match s.get("macs") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(arr)) => {
                        let mut out = Vec::with_capacity(arr.len());
                        for v in arr {
                            out.push(v.as_str().ok_or(RcError::InvalidJsonObject)?.to_string());
                        }
                        out
                    }
                    Some(_) => return Err(RcError::InvalidJsonObject),
                };
                SignalsInfo {
                    macs,
                    hostname: s.get("hostname").and_then(Value::as_str).map(str::to_string),
                }
            }
            Some(_) => return Err(RcError::InvalidJsonObject),
        };

        let fingerprint = match obj.get("fingerprint") {
            None | Some(Value::Null) => FingerprintChecks::default(),
            Some(v @ Value::Object(_)) => {
                serde_json::from_value(v.clone()).map_err(|_| RcError::InvalidJsonObject)?
            }
            Some(_) => return Err(RcError::InvalidJsonObject),
        };

        Ok(SubmitRequest {
            miner,
            miner_id,
            nonce,
            report_commitment,
            device,
            signals,
            fingerprint,
            signature,
            public_key,
        })
    }
}
