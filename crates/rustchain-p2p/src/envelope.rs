use serde::{Deserialize, Serialize};

use rustchain_crypto::ed25519::{sign, verify_signature, SignatureError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Inv,
    GetData,
    Data,
}

/// A signed gossip message. `payload_hash` is authoritative; `payload` is
/// only populated on `Data` envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipEnvelope {
    pub kind: EnvelopeKind,
    pub agent_id: String,
    pub nonce: String,
    pub sig: String,
    pub pubkey: String,
    pub payload_hash: String,
    pub ttl: i64,
    pub ts: i64,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub hashes: Vec<String>,
}

impl GossipEnvelope {
    /// Bytes signed over: everything except `sig` and `payload` itself —
    /// the payload is bound in via `payload_hash`.
    fn signing_bytes(&self) -> Vec<u8> {
        format!(
            "{:?}:{}:{}:{}:{}:{}",
            self.kind, self.agent_id, self.nonce, self.payload_hash, self.ttl, self.ts
        )
        .into_bytes()
    }

    pub fn sign(mut self, secret_key_bytes: &[u8], pubkey_hex: &str) -> Result<Self, SignatureError> {
        self.pubkey = pubkey_hex.to_string();
        let sig = sign(secret_key_bytes, &self.signing_bytes())?;
        self.sig = hex::encode(sig);
        Ok(self)
    }

    pub fn verify(&self) -> Result<(), SignatureError> {
        let pubkey = hex::decode(&self.pubkey).map_err(|_| SignatureError::InvalidSignature)?;
        let sig = hex::decode(&self.sig).map_err(|_| SignatureError::InvalidSignature)?;
        verify_signature(&pubkey, &self.signing_bytes(), &sig)
    }

    pub fn is_expired(&self, now: i64, expiry_seconds: i64) -> bool {
        now - self.ts > expiry_seconds || now > self.ts + self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustchain_crypto::ed25519::RcSigner;

    #[test]
    fn sign_then_verify_round_trip() {
        let signer = RcSigner::generate();
        let envelope = GossipEnvelope {
            kind: EnvelopeKind::Inv,
            agent_id: "node-a".into(),
            nonce: "abc123".into(),
            sig: String::new(),
            pubkey: String::new(),
            payload_hash: "deadbeef".into(),
            ttl: 300,
            ts: 1000,
            payload: None,
            hashes: vec![],
        }
        .sign(signer.secret_key_bytes(), &hex::encode(signer.public_key_bytes))
        .unwrap();

        assert!(envelope.verify().is_ok());
    }

    #[test]
    fn tampered_payload_hash_fails_verification() {
        let signer = RcSigner::generate();
        let mut envelope = GossipEnvelope {
            kind: EnvelopeKind::Data,
            agent_id: "node-a".into(),
            nonce: "abc123".into(),
            sig: String::new(),
            pubkey: String::new(),
            payload_hash: "deadbeef".into(),
            ttl: 300,
            ts: 1000,
            payload: None,
            hashes: vec![],
        }
        .sign(signer.secret_key_bytes(), &hex::encode(signer.public_key_bytes))
        .unwrap();

        envelope.payload_hash = "tampered".into();
        assert!(envelope.verify().is_err());
    }

    #[test]
    fn expiry_is_detected() {
        let envelope = GossipEnvelope {
            kind: EnvelopeKind::Inv,
            agent_id: "node-a".into(),
            nonce: "abc".into(),
            sig: String::new(),
            pubkey: String::new(),
            payload_hash: "deadbeef".into(),
            ttl: 300,
            ts: 1000,
            payload: None,
            hashes: vec![],
        };
        assert!(!envelope.is_expired(1200, 300));
        assert!(envelope.is_expired(1400, 300));
    }
}
