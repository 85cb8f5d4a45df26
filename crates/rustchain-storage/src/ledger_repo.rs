use rusqlite::{params, OptionalExtension, Transaction};

use rustchain_core::error::RcError;

use crate::db::StateDb;

fn credit_in_tx(tx: &Transaction<'_>, address: &str, amount_urtc: u64) -> rusqlite::Result<()> {
    let updated = tx.execute(
        "UPDATE wallets SET amount_urtc = amount_urtc + ?2 WHERE address = ?1",
        params![address, amount_urtc as i64],
    )?;
    if updated == 0 {
        tx.execute(
            "INSERT INTO wallets (address, miner_id, amount_urtc, wallet_nonce) VALUES (?1, NULL, ?2, 0)",
            params![address, amount_urtc as i64],
        )?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    Pending,
    Confirmed,
    Voided,
}

impl PendingStatus {
    fn as_str(self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Confirmed => "confirmed",
            PendingStatus::Voided => "voided",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "confirmed" => PendingStatus::Confirmed,
            "voided" => PendingStatus::Voided,
            _ => PendingStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingTransferRow {
    pub id: String,
    pub from_address: String,
    pub to_address: String,
    pub amount_urtc: u64,
    pub nonce: u64,
    pub signature: String,
    pub status: PendingStatus,
    pub confirms_at: i64,
}

/// Owns `wallets`, `ledger_entries`, `pending_transfers`.
pub struct LedgerRepo<'a> {
    db: &'a StateDb,
}

impl<'a> LedgerRepo<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    /// Balance (uRTC) and wallet nonce for `address`, defaulting to
    /// `(0, 0)` for a wallet that has never been credited.
    pub fn balance_and_nonce(&self, address: &str) -> Result<(u64, u64), RcError> {
        self.db.read(|conn| {
            conn.query_row(
                "SELECT amount_urtc, wallet_nonce FROM wallets WHERE address = ?1",
                params![address],
                |r| Ok((r.get::<_, i64>(0)? as u64, r.get::<_, i64>(1)? as u64)),
            )
            .optional()
            .map(|v| v.unwrap_or((0, 0)))
        })
    }

    /// Credit `address` by `amount_urtc`, creating the wallet row if absent.
    /// Update-then-insert-on-zero-rows, matching the settlement idiom.
    pub fn credit(&self, address: &str, amount_urtc: u64, miner_id: Option<&str>) -> Result<(), RcError> {
        self.db.write(|tx| {
            let updated = tx.execute(
                "UPDATE wallets SET amount_urtc = amount_urtc + ?2 WHERE address = ?1",
                params![address, amount_urtc as i64],
            )?;
            if updated == 0 {
                tx.execute(
                    "INSERT INTO wallets (address, miner_id, amount_urtc, wallet_nonce) VALUES (?1, ?2, ?3, 0)",
                    params![address, miner_id, amount_urtc as i64],
                )?;
            }
            Ok(())
        })
    }

    /// Debit `address` by `amount_urtc`. Fails with `InsufficientBalance`
    /// if the wallet does not hold enough.
    pub fn debit(&self, address: &str, amount_urtc: u64) -> Result<(), RcError> {
        let current = self.db.write(|tx| {
            let current: i64 = tx
                .query_row(
                    "SELECT amount_urtc FROM wallets WHERE address = ?1",
                    params![address],
                    |r| r.get(0),
                )
                .optional()?
                .unwrap_or(0);
            if (current as u64) >= amount_urtc {
                tx.execute(
                    "UPDATE wallets SET amount_urtc = amount_urtc - ?2 WHERE address = ?1",
                    params![address, amount_urtc as i64],
                )?;
            }
            Ok(current as u64)
        })?;
        if current < amount_urtc {
            return Err(RcError::InsufficientBalance {
                need: amount_urtc,
                have: current,
            });
        }
        Ok(())
    }

    /// Bump `wallet_nonce` for `address` by 1.
    pub fn bump_nonce(&self, address: &str) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "UPDATE wallets SET wallet_nonce = wallet_nonce + 1 WHERE address = ?1",
                params![address],
            )?;
            Ok(())
        })
    }

    /// Execute a transfer atomically in one transaction: debit `from` by
    /// `amount + fee`, credit `to` by `amount`, credit `fee_pool_address`
    /// by `fee` (skipped if `fee` is zero), bump `from`'s wallet nonce, and
    /// append three ledger entries. Insufficient balance rolls the whole
    /// transaction back.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_transfer(
        &self,
        from: &str,
        to: &str,
        amount_urtc: u64,
        fee_urtc: u64,
        fee_pool_address: &str,
        ts: i64,
        reason: &str,
    ) -> Result<(), RcError> {
        let total_debit = amount_urtc.saturating_add(fee_urtc);
        self.db.write(|tx| {
            let current: i64 = tx
                .query_row(
                    "SELECT amount_urtc FROM wallets WHERE address = ?1",
                    params![from],
                    |r| r.get(0),
                )
                .optional()?
                .unwrap_or(0);
            if (current as u64) < total_debit {
                return Ok(Some((current as u64, total_debit)));
            }

            tx.execute(
                "UPDATE wallets SET amount_urtc = amount_urtc - ?2, wallet_nonce = wallet_nonce + 1 WHERE address = ?1",
                params![from, total_debit as i64],
            )?;

            credit_in_tx(tx, to, amount_urtc)?;
            if fee_urtc > 0 {
                credit_in_tx(tx, fee_pool_address, fee_urtc)?;
            }

            tx.execute(
                "INSERT INTO ledger_entries (ts, epoch, address, delta_urtc, reason) VALUES (?1, NULL, ?2, ?3, ?4)",
                params![ts, from, -(total_debit as i64), reason],
            )?;
            tx.execute(
                "INSERT INTO ledger_entries (ts, epoch, address, delta_urtc, reason) VALUES (?1, NULL, ?2, ?3, ?4)",
                params![ts, to, amount_urtc as i64, reason],
            )?;
            if fee_urtc > 0 {
                tx.execute(
                    "INSERT INTO ledger_entries (ts, epoch, address, delta_urtc, reason) VALUES (?1, NULL, ?2, ?3, 'fee')",
                    params![ts, fee_pool_address, fee_urtc as i64],
                )?;
            }
            Ok(None)
        })
        .and_then(|shortfall| match shortfall {
            None => Ok(()),
            Some((have, need)) => Err(RcError::InsufficientBalance { need, have }),
        })
    }

    /// Append an immutable ledger entry.
    pub fn append_entry(
        &self,
        ts: i64,
        epoch: Option<u64>,
        address: &str,
        delta_urtc: i64,
        reason: &str,
    ) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO ledger_entries (ts, epoch, address, delta_urtc, reason) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![ts, epoch.map(|e| e as i64), address, delta_urtc, reason],
            )?;
            Ok(())
        })
    }

    /// All wallet balances, ordered by address. Backs the Merkle-root
    /// sync-status probe.
    pub fn all_balances(&self) -> Result<Vec<(String, u64)>, RcError> {
        self.db.read(|conn| {
            let mut stmt =
                conn.prepare("SELECT address, amount_urtc FROM wallets ORDER BY address ASC")?;
            let rows = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as u64)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn entries_for_address(&self, address: &str) -> Result<Vec<(i64, i64, String)>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ts, delta_urtc, reason FROM ledger_entries WHERE address = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map(params![address], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_pending_transfer(&self, row: &PendingTransferRow) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO pending_transfers
                    (id, from_address, to_address, amount_urtc, nonce, signature, status, confirms_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.from_address,
                    row.to_address,
                    row.amount_urtc as i64,
                    row.nonce as i64,
                    row.signature,
                    row.status.as_str(),
                    row.confirms_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Pending transfers whose `confirms_at <= now`, still in `pending` status.
    pub fn matured_pending_transfers(&self, now: i64) -> Result<Vec<PendingTransferRow>, RcError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, from_address, to_address, amount_urtc, nonce, signature, status, confirms_at
                 FROM pending_transfers WHERE status = 'pending' AND confirms_at <= ?1",
            )?;
            let rows = stmt
                .query_map(params![now], Self::row_to_pending)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_pending_status(&self, id: &str, status: PendingStatus) -> Result<(), RcError> {
        self.db.write(|tx| {
            tx.execute(
                "UPDATE pending_transfers SET status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )?;
            Ok(())
        })
    }

    fn row_to_pending(r: &rusqlite::Row) -> rusqlite::Result<PendingTransferRow> {
        Ok(PendingTransferRow {
            id: r.get(0)?,
            from_address: r.get(1)?,
            to_address: r.get(2)?,
            amount_urtc: r.get::<_, i64>(3)? as u64,
            nonce: r.get::<_, i64>(4)? as u64,
            signature: r.get(5)?,
            status: PendingStatus::from_str(&r.get::<_, String>(6)?),
            confirms_at: r.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_creates_wallet_then_accumulates() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = LedgerRepo::new(&db);
        repo.credit("RTCaaa", 500, None).unwrap();
        repo.credit("RTCaaa", 250, None).unwrap();
        let (balance, nonce) = repo.balance_and_nonce("RTCaaa").unwrap();
        assert_eq!(balance, 750);
        assert_eq!(nonce, 0);
    }

    #[test]
    fn debit_rejects_insufficient_balance() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = LedgerRepo::new(&db);
        repo.credit("RTCaaa", 100, None).unwrap();
        let err = repo.debit("RTCaaa", 200).unwrap_err();
        assert!(matches!(err, RcError::InsufficientBalance { need: 200, have: 100 }));
    }

    #[test]
    fn debit_then_nonce_bump() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = LedgerRepo::new(&db);
        repo.credit("RTCaaa", 1_000_000, None).unwrap();
        repo.debit("RTCaaa", 400_000).unwrap();
        repo.bump_nonce("RTCaaa").unwrap();
        let (balance, nonce) = repo.balance_and_nonce("RTCaaa").unwrap();
        assert_eq!(balance, 600_000);
        assert_eq!(nonce, 1);
    }

    #[test]
    fn execute_transfer_moves_funds_and_charges_fee() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = LedgerRepo::new(&db);
        repo.credit("RTCaaa", 1_000_000, None).unwrap();
        repo.execute_transfer("RTCaaa", "RTCbbb", 500_000, 10_000, "RTCfeepool", 100, "transfer")
            .unwrap();

        let (from_balance, from_nonce) = repo.balance_and_nonce("RTCaaa").unwrap();
        assert_eq!(from_balance, 490_000);
        assert_eq!(from_nonce, 1);
        let (to_balance, _) = repo.balance_and_nonce("RTCbbb").unwrap();
        assert_eq!(to_balance, 500_000);
        let (fee_balance, _) = repo.balance_and_nonce("RTCfeepool").unwrap();
        assert_eq!(fee_balance, 10_000);
    }

    #[test]
    fn execute_transfer_rejects_insufficient_balance_and_rolls_back() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = LedgerRepo::new(&db);
        repo.credit("RTCaaa", 1_000, None).unwrap();
        let err = repo
            .execute_transfer("RTCaaa", "RTCbbb", 500_000, 10_000, "RTCfeepool", 100, "transfer")
            .unwrap_err();
        assert!(matches!(err, RcError::InsufficientBalance { .. }));
        let (from_balance, _) = repo.balance_and_nonce("RTCaaa").unwrap();
        assert_eq!(from_balance, 1_000);
        let (to_balance, _) = repo.balance_and_nonce("RTCbbb").unwrap();
        assert_eq!(to_balance, 0);
    }

    #[test]
    fn pending_transfer_matures() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = LedgerRepo::new(&db);
        repo.insert_pending_transfer(&PendingTransferRow {
            id: "p1".into(),
            from_address: "RTCaaa".into(),
            to_address: "RTCbbb".into(),
            amount_urtc: 1000,
            nonce: 1,
            signature: "sig".into(),
            status: PendingStatus::Pending,
            confirms_at: 100,
        })
        .unwrap();
        assert!(repo.matured_pending_transfers(50).unwrap().is_empty());
        let matured = repo.matured_pending_transfers(100).unwrap();
        assert_eq!(matured.len(), 1);
        repo.set_pending_status("p1", PendingStatus::Confirmed).unwrap();
        assert!(repo.matured_pending_transfers(100).unwrap().is_empty());
    }
}
