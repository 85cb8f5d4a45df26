pub mod config;
pub mod envelope;
pub mod message;
pub mod network;
pub mod sync;

pub use config::P2pConfig;
pub use envelope::{EnvelopeKind, GossipEnvelope};
pub use message::{AttestationGossip, EnrollmentGossip, GossipPayload};
pub use network::P2pNetwork;
pub use sync::{compute_sync_status, SyncStatus, TableDigest};

pub(crate) fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64
}
