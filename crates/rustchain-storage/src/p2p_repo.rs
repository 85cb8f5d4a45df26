use rusqlite::{params, OptionalExtension};

use rustchain_core::error::RcError;

use crate::db::StateDb;

#[derive(Debug, Clone)]
pub struct PeerKeyRow {
    pub pubkey_hex: String,
    pub first_seen_at: i64,
    pub revoked: bool,
}

/// Owns `tofu_peer_keys`: trust-on-first-use pinning of peer gossip pubkeys.
pub struct P2pRepo<'a> {
    db: &'a StateDb,
}

impl<'a> P2pRepo<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    pub fn get_peer_key(&self, node_id: &str) -> Result<Option<PeerKeyRow>, RcError> {
        self.db.read(|conn| {
            conn.query_row(
                "SELECT pubkey_hex, first_seen_at, revoked FROM tofu_peer_keys WHERE node_id = ?1",
                params![node_id],
                |r| {
                    Ok(PeerKeyRow {
                        pubkey_hex: r.get(0)?,
                        first_seen_at: r.get(1)?,
                        revoked: r.get::<_, i64>(2)? != 0,
                    })
                },
            )
            .optional()
        })
    }

    /// Pin `pubkey_hex` as the trusted key for `node_id` if none is pinned
    /// yet (or the previous pin was revoked). Does nothing if a live pin
    /// already exists — callers must compare against it instead.
    pub fn tofu_pin(&self, node_id: &str, pubkey_hex: &str, first_seen_at: i64) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO tofu_peer_keys (node_id, pubkey_hex, first_seen_at, revoked)
                 VALUES (?1, ?2, ?3, 0)
                 ON CONFLICT(node_id) DO UPDATE SET
                    pubkey_hex = excluded.pubkey_hex,
                    first_seen_at = excluded.first_seen_at,
                    revoked = 0
                 WHERE tofu_peer_keys.revoked = 1",
                params![node_id, pubkey_hex, first_seen_at],
            )?;
            Ok(())
        })
    }

    /// Admin-only: clear a pinned key so the next message re-triggers TOFU.
    pub fn revoke(&self, node_id: &str) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "UPDATE tofu_peer_keys SET revoked = 1 WHERE node_id = ?1",
                params![node_id],
            )?;
            Ok(())
        })
    }
}
