use rusqlite::{params, OptionalExtension};

use rustchain_core::error::RcError;

use crate::db::StateDb;

/// A persisted attestation snapshot for one miner.
#[derive(Debug, Clone)]
pub struct AttestationRow {
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

/// Owns `hardware_bindings`, `attest_challenges`, `used_nonces`,
/// `miner_attest_recent`, and `blocked_wallets`.
pub struct MinerRepo<'a> {
    db: &'a StateDb,
}

impl<'a> MinerRepo<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    /// Persist a freshly issued challenge nonce.
    pub fn issue_challenge(
        &self,
        nonce_hex: &str,
        miner_id: Option<&str>,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO attest_challenges (nonce, miner_id, issued_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![nonce_hex, miner_id, issued_at, expires_at],
            )?;
            Ok(())
        })
    }

    /// Consume a challenge nonce atomically: returns its row (if still
    /// present and unexpired) and deletes it so it cannot be reused.
    pub fn consume_challenge(
        &self,
        nonce_hex: &str,
        now: i64,
    ) -> Result<Option<(Option<String>, i64)>, RcError> {
        self.db.write(|tx| {
            let row: Option<(Option<String>, i64)> = tx
                .query_row(
                    "SELECT miner_id, expires_at FROM attest_challenges WHERE nonce = ?1",
                    params![nonce_hex],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            if let Some((_, expires_at)) = &row {
                tx.execute(
                    "DELETE FROM attest_challenges WHERE nonce = ?1",
                    params![nonce_hex],
                )?;
                if *expires_at <= now {
                    return Ok(None);
                }
            }
            Ok(row)
        })
    }

    /// Drop expired, unconsumed challenges. Best-effort housekeeping.
    pub fn cleanup_expired_challenges(&self, now: i64) -> Result<usize, RcError> {
        self.db.write(|tx| {
            tx.execute(
                "DELETE FROM attest_challenges WHERE expires_at <= ?1",
                params![now],
            )
        })
    }

    /// Record `(miner_id, nonce)` as used. Returns `false` (replay detected)
    /// if the pair already exists — the primary key conflict acts as the
    /// mutex serialising concurrent submits for the same miner.
    pub fn mark_nonce_used(
        &self,
        miner_id: &str,
        nonce_hex: &str,
        expires_at: i64,
    ) -> Result<bool, RcError> {
        self.db.write(|tx| {
            let result = tx.execute(
                "INSERT INTO used_nonces (miner_id, nonce, expires_at) VALUES (?1, ?2, ?3)",
                params![miner_id, nonce_hex, expires_at],
            );
            match result {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        })
    }

    /// Look up the miner currently bound to `hardware_id`, if any, along
    /// with the public key enrolled for it on first bind (trust-on-first-use).
    pub fn hardware_binding(&self, hardware_id: &str) -> Result<Option<(String, Option<String>)>, RcError> {
        self.db.read(|conn| {
            conn.query_row(
                "SELECT bound_miner, public_key FROM hardware_bindings WHERE hardware_id = ?1",
                params![hardware_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()
        })
    }

    /// Bind `hardware_id` to `miner_id`, enrolling `public_key` as that
    /// hardware's trusted signing key. Caller must have already checked
    /// there is no conflicting binding (§4.4 step 6).
    pub fn bind_hardware(
        &self,
        hardware_id: &str,
        miner_id: &str,
        bound_at: i64,
        public_key: Option<&str>,
    ) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO hardware_bindings (hardware_id, bound_miner, bound_at, public_key) VALUES (?1, ?2, ?3, ?4)",
                params![hardware_id, miner_id, bound_at, public_key],
            )?;
            Ok(())
        })
    }

    pub fn is_blocked(&self, miner_id: &str) -> Result<bool, RcError> {
        self.db.read(|conn| {
            conn.query_row(
                "SELECT 1 FROM blocked_wallets WHERE miner_id = ?1",
                params![miner_id],
                |_| Ok(()),
            )
            .optional()
            .map(|r| r.is_some())
        })
    }

    pub fn block(&self, miner_id: &str, blocked_at: i64, reason: Option<&str>) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO blocked_wallets (miner_id, blocked_at, reason) VALUES (?1, ?2, ?3)",
                params![miner_id, blocked_at, reason],
            )?;
            Ok(())
        })
    }

    /// Upsert the latest attestation snapshot for a miner.
    pub fn upsert_attestation(&self, row: &AttestationRow) -> Result<(), RcError> {
        let macs_json = serde_json::to_string(&row.mac_observations)
            .map_err(|e| RcError::Serialization(e.to_string()))?;
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO miner_attest_recent
                    (miner_id, hardware_id, device_arch, device_family, entropy_score,
                     arch_validation_score, antiquity_tier, antiquity_multiplier,
                     mac_observations, hostname, ts_ok)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(miner_id) DO UPDATE SET
                    hardware_id = excluded.hardware_id,
                    device_arch = excluded.device_arch,
                    device_family = excluded.device_family,
                    entropy_score = excluded.entropy_score,
                    arch_validation_score = excluded.arch_validation_score,
                    antiquity_tier = excluded.antiquity_tier,
                    antiquity_multiplier = excluded.antiquity_multiplier,
                    mac_observations = excluded.mac_observations,
                    hostname = excluded.hostname,
                    ts_ok = excluded.ts_ok
                 WHERE excluded.ts_ok >= miner_attest_recent.ts_ok",
                params![
                    row.miner_id,
                    row.hardware_id,
                    row.device_arch,
                    row.device_family,
                    row.entropy_score,
                    row.arch_validation_score,
                    row.antiquity_tier,
                    row.antiquity_multiplier,
                    macs_json,
                    row.hostname,
                    row.ts_ok,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_attestation(&self, miner_id: &str) -> Result<Option<AttestationRow>, RcError> {
        self.db.read(|conn| {
            conn.query_row(
                "SELECT miner_id, hardware_id, device_arch, device_family, entropy_score,
                        arch_validation_score, antiquity_tier, antiquity_multiplier,
                        mac_observations, hostname, ts_ok
                 FROM miner_attest_recent WHERE miner_id = ?1",
                params![miner_id],
                Self::row_to_attestation,
            )
            .optional()
        })
    }

    /// Miners attested within `ttl_seconds` of `now`.
    pub fn recent_attestations(
        &self,
        now: i64,
        ttl_seconds: i64,
    ) -> Result<Vec<AttestationRow>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT miner_id, hardware_id, device_arch, device_family, entropy_score,
                        arch_validation_score, antiquity_tier, antiquity_multiplier,
                        mac_observations, hostname, ts_ok
                 FROM miner_attest_recent WHERE ts_ok >= ?1 ORDER BY miner_id",
            )?;
            let cutoff = now - ttl_seconds;
            let rows = stmt
                .query_map(params![cutoff], Self::row_to_attestation)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All attestation snapshots, ordered by miner. Backs the Merkle-root
    /// sync-status probe.
    pub fn all_attestations(&self) -> Result<Vec<AttestationRow>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT miner_id, hardware_id, device_arch, device_family, entropy_score,
                        arch_validation_score, antiquity_tier, antiquity_multiplier,
                        mac_observations, hostname, ts_ok
                 FROM miner_attest_recent ORDER BY miner_id",
            )?;
            let rows = stmt
                .query_map([], Self::row_to_attestation)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn row_to_attestation(r: &rusqlite::Row) -> rusqlite::Result<AttestationRow> {
        let macs_json: String = r.get(8)?;
        let mac_observations = serde_json::from_str(&macs_json).unwrap_or_default();
        Ok(AttestationRow {
            miner_id: r.get(0)?,
            hardware_id: r.get(1)?,
            device_arch: r.get(2)?,
            device_family: r.get(3)?,
            entropy_score: r.get(4)?,
            arch_validation_score: r.get(5)?,
            antiquity_tier: r.get(6)?,
            antiquity_multiplier: r.get(7)?,
            mac_observations,
            hostname: r.get(9)?,
            ts_ok: r.get(10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(miner_id: &str, ts_ok: i64) -> AttestationRow {
        AttestationRow {
            miner_id: miner_id.to_string(),
            hardware_id: Some("abc".into()),
            device_arch: "ppc".into(),
            device_family: "g4".into(),
            entropy_score: 0.8,
            arch_validation_score: 0.9,
            antiquity_tier: "classic".into(),
            antiquity_multiplier: 1.5,
            mac_observations: vec!["00:11:22:33:44:55".into()],
            hostname: Some("host".into()),
            ts_ok,
        }
    }

    #[test]
    fn nonce_replay_detected_on_second_mark() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = MinerRepo::new(&db);
        assert!(repo.mark_nonce_used("m1", "deadbeef", 1000).unwrap());
        assert!(!repo.mark_nonce_used("m1", "deadbeef", 1000).unwrap());
    }

    #[test]
    fn challenge_consumed_exactly_once() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = MinerRepo::new(&db);
        repo.issue_challenge("nonce1", Some("m1"), 0, 120).unwrap();
        let first = repo.consume_challenge("nonce1", 10).unwrap();
        assert!(first.is_some());
        let second = repo.consume_challenge("nonce1", 10).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn hardware_binding_is_one_to_one() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = MinerRepo::new(&db);
        assert!(repo.hardware_binding("hw1").unwrap().is_none());
        repo.bind_hardware("hw1", "m1", 100, Some("deadbeef")).unwrap();
        let (bound_miner, public_key) = repo.hardware_binding("hw1").unwrap().unwrap();
        assert_eq!(bound_miner, "m1");
        assert_eq!(public_key.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn attestation_upsert_and_recent_query() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = MinerRepo::new(&db);
        repo.upsert_attestation(&row("m1", 1000)).unwrap();
        let fetched = repo.get_attestation("m1").unwrap().unwrap();
        assert_eq!(fetched.antiquity_tier, "classic");
        assert_eq!(fetched.mac_observations, vec!["00:11:22:33:44:55"]);

        let recent = repo.recent_attestations(1100, 200).unwrap();
        assert_eq!(recent.len(), 1);
        let none = repo.recent_attestations(5000, 10).unwrap();
        assert!(none.is_empty());
    }
}
