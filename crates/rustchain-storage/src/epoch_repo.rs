use rusqlite::{params, OptionalExtension};

use rustchain_core::error::RcError;

use crate::db::StateDb;

/// Owns `epoch_enroll`, `epoch_state`, `epoch_rewards`.
pub struct EpochRepo<'a> {
    db: &'a StateDb,
}

impl<'a> EpochRepo<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    /// Enroll (or re-enroll) a miner for `epoch` with `weight`. A later
    /// enrollment within the same epoch overwrites the weight — local
    /// enrollment is authoritative; P2P merges use [`merge_enrollment`]
    /// with set-union semantics instead.
    pub fn enroll(&self, epoch: u64, miner_pk: &str, weight: f64) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO epoch_enroll (epoch, miner_pk, weight) VALUES (?1, ?2, ?3)
                 ON CONFLICT(epoch, miner_pk) DO UPDATE SET weight = excluded.weight",
                params![epoch as i64, miner_pk, weight],
            )?;
            Ok(())
        })
    }

    /// Merge a remote enrollment observation: set-union semantics — insert
    /// if absent, otherwise keep the existing row untouched (a peer cannot
    /// silently lower or overwrite weight we already observed locally).
    pub fn merge_enrollment(&self, epoch: u64, miner_pk: &str, weight: f64) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT OR IGNORE INTO epoch_enroll (epoch, miner_pk, weight) VALUES (?1, ?2, ?3)",
                params![epoch as i64, miner_pk, weight],
            )?;
            Ok(())
        })
    }

    /// Distinct enrolled miners for `epoch`, with their weight.
    pub fn enrolled_miners(&self, epoch: u64) -> Result<Vec<(String, f64)>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT miner_pk, weight FROM epoch_enroll WHERE epoch = ?1 ORDER BY miner_pk",
            )?;
            let rows = stmt
                .query_map(params![epoch as i64], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn enrolled_count(&self, epoch: u64) -> Result<u64, RcError> {
        self.db.read(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM epoch_enroll WHERE epoch = ?1",
                params![epoch as i64],
                |r| r.get::<_, i64>(0),
            )
        })
        .map(|n| n as u64)
    }

    pub fn is_settled(&self, epoch: u64) -> Result<bool, RcError> {
        self.db.read(|conn| {
            conn.query_row(
                "SELECT settled FROM epoch_state WHERE epoch = ?1",
                params![epoch as i64],
                |r| r.get::<_, i64>(0),
            )
            .optional()
        })
        .map(|v| v.map(|s| s != 0).unwrap_or(false))
    }

    /// Epochs strictly below `current_epoch` that have no `epoch_state` row
    /// or are not yet settled, ascending order.
    pub fn unsettled_epochs_below(&self, current_epoch: u64) -> Result<Vec<u64>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT e.epoch FROM epoch_enroll e
                 LEFT JOIN epoch_state s ON s.epoch = e.epoch
                 WHERE e.epoch < ?1 AND (s.settled IS NULL OR s.settled = 0)
                 ORDER BY e.epoch ASC",
            )?;
            let rows = stmt
                .query_map(params![current_epoch as i64], |r| {
                    r.get::<_, i64>(0).map(|v| v as u64)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All epochs with no `epoch_state` row or not yet settled, regardless
    /// of how they compare to the current epoch. Used by gossip to decide
    /// what enrollment sets are still worth announcing to peers.
    pub fn all_unsettled_epochs(&self) -> Result<Vec<u64>, RcError> {
        self.unsettled_epochs_below(i64::MAX as u64)
    }

    /// Mark `epoch` settled. Idempotent: `INSERT OR REPLACE`, matching the
    /// single source of truth for settlement state.
    pub fn mark_settled(&self, epoch: u64, settled_ts: i64) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO epoch_state (epoch, settled, settled_ts) VALUES (?1, 1, ?2)",
                params![epoch as i64, settled_ts],
            )?;
            Ok(())
        })
    }

    /// Insert a reward row. `INSERT OR IGNORE` makes a second settlement
    /// attempt for the same epoch a no-op rather than a double-credit.
    /// Returns whether a row was actually inserted, so callers crediting a
    /// wallet alongside this can skip the credit on a replayed attempt.
    pub fn insert_reward(&self, epoch: u64, miner_id: &str, share_urtc: u64) -> Result<bool, RcError> {
        self.db.write(|tx| {
            let changed = tx.execute(
                "INSERT OR IGNORE INTO epoch_rewards (epoch, miner_id, share_urtc) VALUES (?1, ?2, ?3)",
                params![epoch as i64, miner_id, share_urtc as i64],
            )?;
            Ok(changed > 0)
        })
    }

    /// All `epoch_state` rows, ordered by epoch. Backs the Merkle-root
    /// sync-status probe.
    pub fn all_epoch_states(&self) -> Result<Vec<(u64, bool, i64)>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn
                .prepare("SELECT epoch, settled, settled_ts FROM epoch_state ORDER BY epoch ASC")?;
            let rows = stmt
                .query_map([], |r| {
                    Ok((
                        r.get::<_, i64>(0)? as u64,
                        r.get::<_, i64>(1)? != 0,
                        r.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All `epoch_rewards` rows, ordered by epoch then miner. Backs the
    /// Merkle-root sync-status probe.
    pub fn all_rewards(&self) -> Result<Vec<(u64, String, u64)>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT epoch, miner_id, share_urtc FROM epoch_rewards ORDER BY epoch ASC, miner_id ASC",
            )?;
            let rows = stmt
                .query_map([], |r| {
                    Ok((
                        r.get::<_, i64>(0)? as u64,
                        r.get::<_, String>(1)?,
                        r.get::<_, i64>(2)? as u64,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn rewards_for_epoch(&self, epoch: u64) -> Result<Vec<(String, u64)>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT miner_id, share_urtc FROM epoch_rewards WHERE epoch = ?1 ORDER BY miner_id",
            )?;
            let rows = stmt
                .query_map(params![epoch as i64], |r| {
                    Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as u64))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enroll_then_settle_idempotent() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = EpochRepo::new(&db);
        repo.enroll(7, "pk_a", 3.0).unwrap();
        repo.enroll(7, "pk_b", 1.5).unwrap();
        assert_eq!(repo.enrolled_count(7).unwrap(), 2);
        assert!(!repo.is_settled(7).unwrap());

        repo.insert_reward(7, "pk_a", 1_000_000).unwrap();
        repo.mark_settled(7, 9999).unwrap();
        assert!(repo.is_settled(7).unwrap());

        // second settlement attempt: reward insert is a no-op, settled stays true
        repo.insert_reward(7, "pk_a", 999).unwrap();
        repo.mark_settled(7, 10000).unwrap();
        let rewards = repo.rewards_for_epoch(7).unwrap();
        assert_eq!(rewards, vec![("pk_a".to_string(), 1_000_000)]);
    }

    #[test]
    fn merge_enrollment_does_not_overwrite_local_weight() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = EpochRepo::new(&db);
        repo.enroll(1, "pk_a", 3.0).unwrap();
        repo.merge_enrollment(1, "pk_a", 1.0).unwrap();
        let miners = repo.enrolled_miners(1).unwrap();
        assert_eq!(miners, vec![("pk_a".to_string(), 3.0)]);
    }

    #[test]
    fn unsettled_epochs_excludes_settled_and_future() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = EpochRepo::new(&db);
        repo.enroll(3, "pk_a", 1.0).unwrap();
        repo.enroll(4, "pk_a", 1.0).unwrap();
        repo.mark_settled(3, 1).unwrap();
        let unsettled = repo.unsettled_epochs_below(10).unwrap();
        assert_eq!(unsettled, vec![4]);
    }
}
