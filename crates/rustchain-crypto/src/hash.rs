use blake2::{Blake2b, Digest};
use sha2::Sha256;

use rustchain_core::types::Address;

/// `addr = "RTC" + hex(SHA-256(pubkey_bytes))[:40]`.
pub fn address_from_pubkey(pubkey_bytes: &[u8]) -> Address {
    let digest = Sha256::digest(pubkey_bytes);
    let hex_digest = hex::encode(digest);
    Address::from_string(format!("{}{}", Address::PREFIX, &hex_digest[..40]))
}

/// Canonical challenge commitment: SHA-256 over UTF-8 `<nonce><wallet><miner_id>`.
pub fn challenge_commitment(nonce_hex: &str, wallet: &str, miner_id: &str) -> [u8; 32] {
    let mut input = String::with_capacity(nonce_hex.len() + wallet.len() + miner_id.len());
    input.push_str(nonce_hex);
    input.push_str(wallet);
    input.push_str(miner_id);
    let digest = Sha256::digest(input.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

type Blake2b256 = Blake2b<blake2::digest::consts::U32>;

/// BLAKE2b-256 over concatenated payload hashes for a batched gossip digest.
pub fn commitment_hash(payload_hashes: &[[u8; 32]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for h in payload_hashes {
        hasher.update(h);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// SHA-256 over (device_model, device_arch, device_family, serial, first_mac)
/// in that fixed order, producing the 32-hex-char `hardware_id`.
pub fn hardware_id(
    device_model: &str,
    device_arch: &str,
    device_family: &str,
    serial: &str,
    first_mac: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(device_model.as_bytes());
    hasher.update(b"\0");
    hasher.update(device_arch.as_bytes());
    hasher.update(b"\0");
    hasher.update(device_family.as_bytes());
    hasher.update(b"\0");
    hasher.update(serial.as_bytes());
    hasher.update(b"\0");
    hasher.update(first_mac.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16]) // 16 bytes -> 32 hex chars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_has_expected_shape() {
        let addr = address_from_pubkey(b"some public key bytes");
        assert_eq!(addr.as_str().len(), Address::LEN);
        assert!(addr.as_str().starts_with(Address::PREFIX));
        assert!(Address::is_well_formed(addr.as_str()));
    }

    #[test]
    fn address_is_deterministic() {
        let a = address_from_pubkey(b"key-a");
        let b = address_from_pubkey(b"key-a");
        assert_eq!(a, b);
    }

    #[test]
    fn hardware_id_is_32_hex_chars() {
        let id = hardware_id("MacBook", "ppc", "g4", "SN123", "00:11:22:33:44:55");
        assert_eq!(id.len(), 32);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn commitment_hash_is_deterministic() {
        let h1 = [1u8; 32];
        let h2 = [2u8; 32];
        let a = commitment_hash(&[h1, h2]);
        let b = commitment_hash(&[h1, h2]);
        assert_eq!(a, b);
        let c = commitment_hash(&[h2, h1]);
        assert_ne!(a, c);
    }
}
