use std::collections::HashMap;

/// Static peer set loaded at boot. No dynamic discovery: peers are added
/// or removed only by restarting the node with a different configuration.
#[derive(Debug, Clone)]
pub struct P2pConfig {
    pub self_node_id: String,
    pub peers: HashMap<String, String>,
    pub gossip_interval_seconds: u64,
    pub message_expiry_seconds: i64,
    pub peer_request_timeout_seconds: u64,
}
