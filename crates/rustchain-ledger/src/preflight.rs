use serde_json::Value;

use rustchain_core::error::RcError;
use rustchain_core::types::Address;

/// A preflight-validated signed transfer request, ready for signature
/// verification and execution.
#[derive(Debug, Clone)]
pub struct ValidatedTransfer {
    pub from_address: String,
    pub to_address: String,
    pub amount_urtc: u64,
    pub nonce: u64,
    pub signature_hex: String,
    pub public_key_hex: String,
    pub memo: Option<String>,
}

/// Validate a `POST /wallet/transfer/signed` body. Checks body shape,
/// required fields, address format, amount finiteness/positivity/
/// quantization, and `from != to`, in that order — matching the exact
/// preflight sequence and error codes this system always used.
pub fn validate_signed_transfer(raw: &Value) -> Result<ValidatedTransfer, RcError> {
    let obj = raw.as_object().ok_or(RcError::InvalidJsonObject)?;

    let required = ["from_address", "to_address", "amount_rtc", "nonce", "signature", "public_key"];
    let missing: Vec<String> = required
        .iter()
        .filter(|k| !obj.get(**k).map(is_present).unwrap_or(false))
        .map(|k| k.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RcError::MissingRequiredFields(missing));
    }

    let from_address = obj.get("from_address").and_then(Value::as_str).unwrap_or("").trim().to_string();
    let to_address = obj.get("to_address").and_then(Value::as_str).unwrap_or("").trim().to_string();

    let amount_rtc = as_finite_f64(obj.get("amount_rtc").unwrap())?;
    if amount_rtc <= 0.0 {
        return Err(RcError::AmountMustBePositive);
    }

    if !Address::is_well_formed(&from_address) {
        return Err(RcError::InvalidFromAddressFormat);
    }
    if !Address::is_well_formed(&to_address) {
        return Err(RcError::InvalidToAddressFormat);
    }
    if from_address == to_address {
        return Err(RcError::FromToMustDiffer);
    }

    let nonce = parse_nonce(obj.get("nonce").unwrap())?;

    let amount_urtc = (amount_rtc * rustchain_core::constants::URTC_PER_RTC as f64).round();
    if amount_urtc < 1.0 {
        return Err(RcError::AmountTooSmallAfterQuantization);
    }

    let signature_hex = obj.get("signature").and_then(Value::as_str).unwrap_or("").to_string();
    let public_key_hex = obj.get("public_key").and_then(Value::as_str).unwrap_or("").to_string();
    let memo = obj.get("memo").and_then(Value::as_str).map(str::to_string);

    Ok(ValidatedTransfer {
        from_address,
        to_address,
        amount_urtc: amount_urtc as u64,
        nonce,
        signature_hex,
        public_key_hex,
        memo,
    })
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        _ => true,
    }
}

fn as_finite_f64(v: &Value) -> Result<f64, RcError> {
    let f = match v {
        Value::Number(n) => n.as_f64().ok_or(RcError::AmountNotFinite)?,
        Value::String(s) => s.parse::<f64>().map_err(|_| RcError::AmountNotFinite)?,
        _ => return Err(RcError::AmountNotFinite),
    };
    if !f.is_finite() {
        return Err(RcError::AmountNotFinite);
    }
    Ok(f)
}

fn parse_nonce(v: &Value) -> Result<u64, RcError> {
    let n: i64 = match v {
        Value::Number(n) => n.as_i64().ok_or(RcError::NonceNotInt)?,
        Value::String(s) => s.parse::<i64>().map_err(|_| RcError::NonceNotInt)?,
        _ => return Err(RcError::NonceNotInt),
    };
    if n <= 0 {
        return Err(RcError::NonceMustBeGtZero);
    }
    Ok(n as u64)
}

/// Canonical message signed by the sender over a transfer.
pub fn canonical_transfer_message(from: &str, to: &str, amount_urtc: u64, nonce: u64, memo: Option<&str>) -> Vec<u8> {
    format!("{from}:{to}:{amount_urtc}:{nonce}:{}", memo.unwrap_or("")).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "from_address": "RTC".to_string() + &"a".repeat(40),
            "to_address": "RTC".to_string() + &"b".repeat(40),
            "amount_rtc": 1.5,
            "nonce": 1,
            "signature": "abcd",
            "public_key": "ef01"
        })
    }

    #[test]
    fn valid_body_passes() {
        let v = validate_signed_transfer(&valid_body()).unwrap();
        assert_eq!(v.amount_urtc, 1_500_000);
    }

    #[test]
    fn missing_fields_rejected() {
        let body = json!({"from_address": "RTCx"});
        let err = validate_signed_transfer(&body).unwrap_err();
        assert!(matches!(err, RcError::MissingRequiredFields(_)));
    }

    #[test]
    fn non_finite_amount_rejected() {
        let mut body = valid_body();
        body["amount_rtc"] = json!("not-a-number");
        let err = validate_signed_transfer(&body).unwrap_err();
        assert!(matches!(err, RcError::AmountNotFinite));
    }

    #[test]
    fn from_equals_to_rejected() {
        let mut body = valid_body();
        body["to_address"] = body["from_address"].clone();
        let err = validate_signed_transfer(&body).unwrap_err();
        assert!(matches!(err, RcError::FromToMustDiffer));
    }

    #[test]
    fn amount_too_small_after_quantization_rejected() {
        let mut body = valid_body();
        body["amount_rtc"] = json!(0.0000001);
        let err = validate_signed_transfer(&body).unwrap_err();
        assert!(matches!(err, RcError::AmountTooSmallAfterQuantization));
    }

    #[test]
    fn nonzero_nonce_required() {
        let mut body = valid_body();
        body["nonce"] = json!(0);
        let err = validate_signed_transfer(&body).unwrap_err();
        assert!(matches!(err, RcError::NonceMustBeGtZero));
    }
}
