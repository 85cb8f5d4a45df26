use serde::{Deserialize, Serialize};
use std::fmt;

/// Balance in micro-RTC (1 RTC = 1_000_000 uRTC).
pub type AmountUrtc = u64;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Per-wallet transfer sequence number (monotonically increasing).
pub type WalletNonce = u64;

/// Slot index: `(now - GENESIS_TIMESTAMP) / BLOCK_TIME_SECONDS`.
pub type Slot = u64;

/// Epoch index: `slot / EPOCH_SLOTS`.
pub type Epoch = u64;

// ── Address ──────────────────────────────────────────────────────────────────

/// RTC address: `"RTC" + hex(SHA-256(pubkey))[:40]`, 43 chars total.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub const PREFIX: &'static str = "RTC";
    pub const LEN: usize = 43;

    /// Construct from an already-validated string. Prefer
    /// `rustchain_crypto::hash::address_from_pubkey` to derive one.
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shape check only: `RTC` prefix, 43 chars, lowercase hex tail.
    /// Does not verify the address was actually derived from a pubkey.
    pub fn is_well_formed(s: &str) -> bool {
        if s.len() != Self::LEN || !s.starts_with(Self::PREFIX) {
            return false;
        }
        s[Self::PREFIX.len()..]
            .bytes()
            .all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

// ── MinerId ──────────────────────────────────────────────────────────────────

/// Opaque client-chosen miner identifier, ≤128 bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MinerId(pub String);

impl MinerId {
    pub const MAX_LEN: usize = 128;

    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.len() <= Self::MAX_LEN
    }
}

impl fmt::Display for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MinerId({})", self.0)
    }
}

// ── HardwareId ───────────────────────────────────────────────────────────────

/// 32 hex chars: SHA-256 over (device_model, device_arch, device_family,
/// serial, first MAC) in that fixed order.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareId(pub String);

impl HardwareId {
    pub const LEN: usize = 32;
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HardwareId({})", self.0)
    }
}

// ── NonceToken ───────────────────────────────────────────────────────────────

/// 32 random bytes issued by `/attest/challenge`, represented as hex on the wire.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonceToken(pub [u8; 32]);

impl NonceToken {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for NonceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for NonceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NonceToken({}…)", &self.to_hex()[..8])
    }
}

// ── AntiquityTier ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiquityTier {
    Ancient,
    Classic,
    Vintage,
    Modern,
    Emulated,
}

impl fmt::Display for AntiquityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AntiquityTier::Ancient => "ancient",
            AntiquityTier::Classic => "classic",
            AntiquityTier::Vintage => "vintage",
            AntiquityTier::Modern => "modern",
            AntiquityTier::Emulated => "emulated",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_well_formed() {
        let addr = "RTC".to_string() + &"a".repeat(40);
        assert!(Address::is_well_formed(&addr));
        assert_eq!(addr.len(), Address::LEN);
    }

    #[test]
    fn address_rejects_wrong_prefix_and_length() {
        assert!(!Address::is_well_formed("XYZ1234"));
        assert!(!Address::is_well_formed(&("RTC".to_string() + &"a".repeat(39))));
        assert!(!Address::is_well_formed(&("RTC".to_string() + &"A".repeat(40))));
    }

    #[test]
    fn nonce_token_hex_round_trip() {
        let token = NonceToken([7u8; 32]);
        let hex = token.to_hex();
        let back = NonceToken::from_hex(&hex).unwrap();
        assert_eq!(token, back);
    }
}
