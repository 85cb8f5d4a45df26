use rustchain_core::types::Address;
use zeroize::Zeroize;

use crate::ed25519::RcSigner;
use crate::hash::address_from_pubkey;

/// An RTC keypair: Ed25519 public/secret key with its derived address.
///
/// The secret key is held by the inner `RcSigner`, which zeroizes on drop.
pub struct KeyPair {
    pub address: Address,
    pub public_key_bytes: [u8; 32],
    signer: RcSigner,
}

impl KeyPair {
    pub fn generate() -> Self {
        let signer = RcSigner::generate();
        let address = address_from_pubkey(&signer.public_key_bytes);
        Self {
            address,
            public_key_bytes: signer.public_key_bytes,
            signer,
        }
    }

    pub fn from_raw(sk_bytes: [u8; 32]) -> Self {
        let signer = RcSigner::from_secret_key_bytes(sk_bytes);
        let address = address_from_pubkey(&signer.public_key_bytes);
        Self {
            address,
            public_key_bytes: signer.public_key_bytes,
            signer,
        }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signer.sign(message)
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.public_key_bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ address: {:?} }}", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keypair_address_round_trips() {
        let kp = KeyPair::generate();
        assert_eq!(address_from_pubkey(&kp.public_key_bytes), kp.address);
    }
}
