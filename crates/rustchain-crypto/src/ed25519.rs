use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key length: expected {expected}, got {got}")]
    InvalidPublicKeyLength { expected: usize, got: usize },
    #[error("invalid signature length: expected {expected}, got {got}")]
    InvalidSignatureLength { expected: usize, got: usize },
}

/// Sign `message` with an Ed25519 secret key (32 raw bytes).
pub fn sign(secret_key_bytes: &[u8], message: &[u8]) -> Result<[u8; 64], SignatureError> {
    let arr: [u8; 32] = secret_key_bytes
        .try_into()
        .map_err(|_| SignatureError::InvalidPublicKeyLength {
            expected: 32,
            got: secret_key_bytes.len(),
        })?;
    let signing_key = SigningKey::from_bytes(&arr);
    Ok(signing_key.sign(message).to_bytes())
}

/// Verify an Ed25519 signature.
pub fn verify_signature(
    public_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), SignatureError> {
    let pk_arr: [u8; 32] =
        public_key_bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidPublicKeyLength {
                expected: 32,
                got: public_key_bytes.len(),
            })?;
    let verifying_key =
        VerifyingKey::from_bytes(&pk_arr).map_err(|_| SignatureError::InvalidSignature)?;
    let sig_arr: [u8; 64] =
        signature_bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidSignatureLength {
                expected: 64,
                got: signature_bytes.len(),
            })?;
    let signature = Signature::from_bytes(&sig_arr);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignatureError::InvalidSignature)
}

/// Stateless signer helper. Secret key material is held in a `Zeroizing`
/// buffer and wiped on drop.
pub struct RcSigner {
    pub public_key_bytes: [u8; 32],
    secret_key_bytes: Zeroizing<[u8; 32]>,
}

impl RcSigner {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self {
            public_key_bytes: signing_key.verifying_key().to_bytes(),
            secret_key_bytes: Zeroizing::new(signing_key.to_bytes()),
        }
    }

    pub fn from_secret_key_bytes(sk_bytes: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&sk_bytes);
        Self {
            public_key_bytes: signing_key.verifying_key().to_bytes(),
            secret_key_bytes: Zeroizing::new(sk_bytes),
        }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signing_key = SigningKey::from_bytes(&self.secret_key_bytes);
        signing_key.sign(message).to_bytes()
    }

    /// Raw secret key bytes, for callers (e.g. the P2P envelope signer)
    /// that need to sign with this identity outside of `sign()`.
    pub fn secret_key_bytes(&self) -> &[u8; 32] {
        &self.secret_key_bytes
    }
}

impl std::fmt::Debug for RcSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RcSigner {{ public_key: {} }}", hex::encode(self.public_key_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let signer = RcSigner::generate();
        let message = b"RTCaaa:RTCbbb:1500000:5:";
        let sig = signer.sign(message);
        assert!(verify_signature(&signer.public_key_bytes, message, &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let signer = RcSigner::generate();
        let sig = signer.sign(b"original");
        assert!(verify_signature(&signer.public_key_bytes, b"tampered", &sig).is_err());
    }

    #[test]
    fn wrong_public_key_fails() {
        let signer = RcSigner::generate();
        let other = RcSigner::generate();
        let sig = signer.sign(b"message");
        assert!(verify_signature(&other.public_key_bytes, b"message", &sig).is_err());
    }
}
