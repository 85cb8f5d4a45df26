use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use rustchain_core::error::RcError;
use rustchain_crypto::ed25519::RcSigner;
use rustchain_storage::{EpochRepo, MinerRepo, P2pRepo, StateDb};

use crate::config::P2pConfig;
use crate::envelope::{EnvelopeKind, GossipEnvelope};
use crate::message::{payload_hash, AttestationGossip, EnrollmentGossip, GossipPayload};

/// Shared P2P state. `Arc`'d and handed to both the background gossip
/// ticker and the HTTP handlers that accept inbound envelopes.
pub struct P2pNetwork {
    db: Arc<StateDb>,
    config: P2pConfig,
    signer: Arc<RcSigner>,
    http: reqwest::Client,
    /// `payload_hash -> first_seen_ts`. Backs both dedupe and expiry; a
    /// hash present here has already been applied locally.
    seen: Mutex<HashMap<String, i64>>,
}

impl P2pNetwork {
    pub fn new(db: Arc<StateDb>, config: P2pConfig, signer: Arc<RcSigner>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.peer_request_timeout_seconds))
            .build()
            .expect("reqwest client");
        Self {
            db,
            config,
            signer,
            http,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Drive the gossip loop. Run in its own `tokio::spawn`ed task. A
    /// single tick's error never kills the loop.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.gossip_interval_seconds));
        loop {
            interval.tick().await;
            let now = crate::now_unix();
            self.expire_seen(now);
            if let Err(e) = self.tick(now).await {
                warn!(error = %e, "gossip tick failed");
            }
        }
    }

    fn expire_seen(&self, now: i64) {
        let mut seen = self.seen.lock().unwrap();
        seen.retain(|_, ts| now - *ts <= self.config.message_expiry_seconds);
    }

    fn recent_items(&self, now: i64) -> Result<Vec<(String, GossipPayload)>, RcError> {
        let mut items = Vec::new();

        let miner_repo = MinerRepo::new(&self.db);
        for row in miner_repo.recent_attestations(now, self.config.message_expiry_seconds)? {
            let payload = GossipPayload::Attestation(AttestationGossip::from(row));
            items.push((payload_hash(&payload), payload));
        }

        let epoch_repo = EpochRepo::new(&self.db);
        for epoch in epoch_repo.all_unsettled_epochs()? {
            for (miner_pk, weight) in epoch_repo.enrolled_miners(epoch)? {
                let payload = GossipPayload::Enrollment(EnrollmentGossip {
                    epoch,
                    miner_pk,
                    weight,
                });
                items.push((payload_hash(&payload), payload));
            }
        }

        Ok(items)
    }

    /// One gossip round: announce recent items to every configured peer,
    /// send data for whatever each peer asks back for.
    async fn tick(&self, now: i64) -> Result<(), RcError> {
        let items = self.recent_items(now)?;
        if items.is_empty() {
            return Ok(());
        }
        let hashes: Vec<String> = items.iter().map(|(h, _)| h.clone()).collect();

        for (node_id, base_url) in &self.config.peers {
            if let Err(e) = self.gossip_to_peer(node_id, base_url, &hashes, &items, now).await {
                warn!(peer = %node_id, error = %e, "gossip to peer failed, continuing");
            }
        }
        Ok(())
    }

    async fn gossip_to_peer(
        &self,
        node_id: &str,
        base_url: &str,
        hashes: &[String],
        items: &[(String, GossipPayload)],
        now: i64,
    ) -> Result<(), RcError> {
        let inv = self.build_envelope(EnvelopeKind::Inv, hashes.to_vec(), None, now)?;
        let resp: GossipEnvelope = self
            .http
            .post(format!("{base_url}/p2p/inv"))
            .json(&inv)
            .send()
            .await
            .map_err(|e| RcError::Other(format!("peer request failed: {e}")))?
            .json()
            .await
            .map_err(|e| RcError::Other(format!("peer response malformed: {e}")))?;

        if resp.kind != EnvelopeKind::GetData {
            return Ok(());
        }
        self.authenticate_envelope(&resp, now)?;

        for wanted_hash in &resp.hashes {
            if let Some((_, payload)) = items.iter().find(|(h, _)| h == wanted_hash) {
                let data_env = self.build_envelope(
                    EnvelopeKind::Data,
                    vec![],
                    Some((wanted_hash.clone(), payload.clone())),
                    now,
                )?;
                if let Err(e) = self
                    .http
                    .post(format!("{base_url}/p2p/data"))
                    .json(&data_env)
                    .send()
                    .await
                {
                    warn!(peer = %node_id, error = %e, "failed to push data to peer");
                }
            }
        }
        Ok(())
    }

    fn build_envelope(
        &self,
        kind: EnvelopeKind,
        hashes: Vec<String>,
        data: Option<(String, GossipPayload)>,
        now: i64,
    ) -> Result<GossipEnvelope, RcError> {
        let (payload_hash, payload) = match data {
            Some((hash, payload)) => (hash, Some(serde_json::to_value(&payload).map_err(|e| {
                RcError::Serialization(e.to_string())
            })?)),
            None => (String::new(), None),
        };
        let envelope = GossipEnvelope {
            kind,
            agent_id: self.config.self_node_id.clone(),
            nonce: hex::encode(rand::random::<[u8; 16]>()),
            sig: String::new(),
            pubkey: String::new(),
            payload_hash,
            ttl: self.config.message_expiry_seconds,
            ts: now,
            payload,
            hashes,
        };
        envelope
            .sign(self.signer.secret_key_bytes(), &hex::encode(self.signer.public_key_bytes))
            .map_err(|_| RcError::InvalidSignature)
    }

    /// Verify envelope signature under TOFU: capture the pubkey on first
    /// contact from `agent_id`, otherwise require it match the pinned key.
    fn authenticate_envelope(&self, envelope: &GossipEnvelope, now: i64) -> Result<(), RcError> {
        if envelope.is_expired(now, self.config.message_expiry_seconds) {
            return Err(RcError::UnknownPeer(envelope.agent_id.clone()));
        }
        let p2p_repo = P2pRepo::new(&self.db);
        match p2p_repo.get_peer_key(&envelope.agent_id)? {
            None => {
                p2p_repo.tofu_pin(&envelope.agent_id, &envelope.pubkey, now)?;
                info!(peer = %envelope.agent_id, "TOFU-pinned new peer key");
            }
            Some(pinned) if pinned.revoked => {
                p2p_repo.tofu_pin(&envelope.agent_id, &envelope.pubkey, now)?;
                info!(peer = %envelope.agent_id, "TOFU-pinned peer key after revoke");
            }
            Some(pinned) if pinned.pubkey_hex != envelope.pubkey => {
                warn!(peer = %envelope.agent_id, "peer pubkey mismatch, dropping");
                return Err(RcError::PeerKeyMismatch);
            }
            Some(_) => {}
        }
        envelope.verify().map_err(|_| RcError::InvalidSignature)
    }

    /// Handle an inbound `inv`: respond with a signed `getdata` listing the
    /// hashes we don't already have.
    pub fn handle_inv(&self, envelope: &GossipEnvelope, now: i64) -> Result<GossipEnvelope, RcError> {
        self.authenticate_envelope(envelope, now)?;
        let seen = self.seen.lock().unwrap();
        let wanted: Vec<String> = envelope
            .hashes
            .iter()
            .filter(|h| !seen.contains_key(h.as_str()))
            .cloned()
            .collect();
        drop(seen);
        self.build_envelope(EnvelopeKind::GetData, wanted, None, now)
    }

    /// Handle an inbound `data`: verify, merge by CRDT rule, record as seen.
    pub fn handle_data(&self, envelope: &GossipEnvelope, now: i64) -> Result<(), RcError> {
        self.authenticate_envelope(envelope, now)?;
        let payload_value = envelope
            .payload
            .clone()
            .ok_or_else(|| RcError::Other("data envelope missing payload".into()))?;
        let payload: GossipPayload =
            serde_json::from_value(payload_value).map_err(|e| RcError::Serialization(e.to_string()))?;
        let computed_hash = payload_hash(&payload);
        if computed_hash != envelope.payload_hash {
            return Err(RcError::EnvelopePayloadHashMismatch);
        }

        let mut seen = self.seen.lock().unwrap();
        if seen.contains_key(&computed_hash) {
            return Ok(());
        }
        seen.insert(computed_hash, now);
        drop(seen);

        self.merge_payload(&payload)
    }

    fn merge_payload(&self, payload: &GossipPayload) -> Result<(), RcError> {
        match payload {
            GossipPayload::Attestation(a) => {
                let miner_repo = MinerRepo::new(&self.db);
                let existing = miner_repo.get_attestation(&a.miner_id)?;
                if existing.as_ref().map(|e| e.ts_ok).unwrap_or(i64::MIN) > a.ts_ok {
                    debug!(miner = %a.miner_id, "ignoring stale gossiped attestation");
                    return Ok(());
                }
                miner_repo.upsert_attestation(&rustchain_storage::AttestationRow {
                    miner_id: a.miner_id.clone(),
                    hardware_id: a.hardware_id.clone(),
                    device_arch: a.device_arch.clone(),
                    device_family: a.device_family.clone(),
                    entropy_score: a.entropy_score,
                    arch_validation_score: a.arch_validation_score,
                    antiquity_tier: a.antiquity_tier.clone(),
                    antiquity_multiplier: a.antiquity_multiplier,
                    mac_observations: a.mac_observations.clone(),
                    hostname: a.hostname.clone(),
                    ts_ok: a.ts_ok,
                })
            }
            GossipPayload::Enrollment(e) => {
                EpochRepo::new(&self.db).merge_enrollment(e.epoch, &e.miner_pk, e.weight)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn config(node_id: &str) -> P2pConfig {
        P2pConfig {
            self_node_id: node_id.to_string(),
            peers: Map::new(),
            gossip_interval_seconds: 30,
            message_expiry_seconds: 300,
            peer_request_timeout_seconds: 5,
        }
    }

    #[test]
    fn inv_roundtrip_requests_only_unknown_hashes() {
        let db = Arc::new(StateDb::open_in_memory().unwrap());
        let signer = Arc::new(RcSigner::generate());
        let net = P2pNetwork::new(db, config("node-a"), signer.clone());

        let payload = GossipPayload::Enrollment(EnrollmentGossip {
            epoch: 1,
            miner_pk: "pk_a".into(),
            weight: 3.0,
        });
        let hash = payload_hash(&payload);
        net.seen.lock().unwrap().insert(hash.clone(), 100);

        let sender = Arc::new(RcSigner::generate());
        let inv = GossipEnvelope {
            kind: EnvelopeKind::Inv,
            agent_id: "node-b".into(),
            nonce: "n1".into(),
            sig: String::new(),
            pubkey: String::new(),
            payload_hash: String::new(),
            ttl: 300,
            ts: 100,
            payload: None,
            hashes: vec![hash.clone(), "unknown-hash".into()],
        }
        .sign(sender.secret_key_bytes(), &hex::encode(sender.public_key_bytes))
        .unwrap();

        let reply = net.handle_inv(&inv, 100).unwrap();
        assert_eq!(reply.kind, EnvelopeKind::GetData);
        assert_eq!(reply.hashes, vec!["unknown-hash".to_string()]);
    }

    #[test]
    fn data_from_unknown_peer_is_tofu_pinned_then_merged() {
        let db = Arc::new(StateDb::open_in_memory().unwrap());
        let signer = Arc::new(RcSigner::generate());
        let net = P2pNetwork::new(db.clone(), config("node-a"), signer);

        let sender = RcSigner::generate();
        let payload = GossipPayload::Enrollment(EnrollmentGossip {
            epoch: 5,
            miner_pk: "pk_z".into(),
            weight: 1.5,
        });
        let hash = payload_hash(&payload);
        let env = GossipEnvelope {
            kind: EnvelopeKind::Data,
            agent_id: "node-b".into(),
            nonce: "n2".into(),
            sig: String::new(),
            pubkey: String::new(),
            payload_hash: hash,
            ttl: 300,
            ts: 100,
            payload: Some(serde_json::to_value(&payload).unwrap()),
            hashes: vec![],
        }
        .sign(sender.secret_key_bytes(), &hex::encode(sender.public_key_bytes))
        .unwrap();

        net.handle_data(&env, 100).unwrap();
        let miners = EpochRepo::new(&db).enrolled_miners(5).unwrap();
        assert_eq!(miners, vec![("pk_z".to_string(), 1.5)]);

        // replaying the identical envelope is a dedup no-op, not an error.
        net.handle_data(&env, 101).unwrap();
    }

    #[test]
    fn data_with_tampered_payload_hash_is_rejected() {
        let db = Arc::new(StateDb::open_in_memory().unwrap());
        let signer = Arc::new(RcSigner::generate());
        let net = P2pNetwork::new(db, config("node-a"), signer);

        let sender = RcSigner::generate();
        let payload = GossipPayload::Enrollment(EnrollmentGossip {
            epoch: 5,
            miner_pk: "pk_z".into(),
            weight: 1.5,
        });
        let env = GossipEnvelope {
            kind: EnvelopeKind::Data,
            agent_id: "node-b".into(),
            nonce: "n3".into(),
            sig: String::new(),
            pubkey: String::new(),
            payload_hash: "wrong-hash".into(),
            ttl: 300,
            ts: 100,
            payload: Some(serde_json::to_value(&payload).unwrap()),
            hashes: vec![],
        }
        .sign(sender.secret_key_bytes(), &hex::encode(sender.public_key_bytes))
        .unwrap();

        let err = net.handle_data(&env, 100).unwrap_err();
        assert!(matches!(err, RcError::EnvelopePayloadHashMismatch));
    }
}
