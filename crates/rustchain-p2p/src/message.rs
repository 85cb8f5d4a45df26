use serde::{Deserialize, Serialize};

use rustchain_storage::AttestationRow;

/// The two gossip-able record kinds, tagged so a `data` envelope's payload
/// can be merged by the right CRDT rule on receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum GossipPayload {
    Attestation(AttestationGossip),
    Enrollment(EnrollmentGossip),
}

/// Mirrors `miner_attest_recent`. Merged last-writer-wins by `ts_ok`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationGossip {
    pub miner_id: String,
    pub hardware_id: Option<String>,
    pub device_arch: String,
    pub device_family: String,
    pub entropy_score: f64,
    pub arch_validation_score: f64,
    pub antiquity_tier: String,
    pub antiquity_multiplier: f64,
    pub mac_observations: Vec<String>,
    pub hostname: Option<String>,
    pub ts_ok: i64,
}

impl From<AttestationRow> for AttestationGossip {
    fn from(row: AttestationRow) -> Self {
        Self {
            miner_id: row.miner_id,
            hardware_id: row.hardware_id,
            device_arch: row.device_arch,
            device_family: row.device_family,
            entropy_score: row.entropy_score,
            arch_validation_score: row.arch_validation_score,
            antiquity_tier: row.antiquity_tier,
            antiquity_multiplier: row.antiquity_multiplier,
            mac_observations: row.mac_observations,
            hostname: row.hostname,
            ts_ok: row.ts_ok,
        }
    }
}

/// Mirrors one `epoch_enroll` row. Merged by set union (§4.7): a peer
/// observation never overwrites a locally enrolled weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentGossip {
    pub epoch: u64,
    pub miner_pk: String,
    pub weight: f64,
}

/// Canonical bytes for hashing a payload into its `payload_hash`. Field
/// order is fixed by this function, not by JSON serialization order, so it
/// stays stable across serde versions.
pub fn canonical_payload_bytes(payload: &GossipPayload) -> Vec<u8> {
    match payload {
        GossipPayload::Attestation(a) => format!(
            "attestation:{}:{}:{}:{}:{:.6}:{:.6}:{}:{:.6}:{}:{}:{}",
            a.miner_id,
            a.hardware_id.as_deref().unwrap_or(""),
            a.device_arch,
            a.device_family,
            a.entropy_score,
            a.arch_validation_score,
            a.antiquity_tier,
            a.antiquity_multiplier,
            a.mac_observations.join(","),
            a.hostname.as_deref().unwrap_or(""),
            a.ts_ok
        )
        .into_bytes(),
        GossipPayload::Enrollment(e) => {
            format!("enrollment:{}:{}:{:.6}", e.epoch, e.miner_pk, e.weight).into_bytes()
        }
    }
}

pub fn payload_hash(payload: &GossipPayload) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(canonical_payload_bytes(payload)))
}
