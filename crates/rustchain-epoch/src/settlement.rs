use tracing::{info, warn};

use rustchain_core::error::RcError;
use rustchain_storage::{EpochRepo, LedgerRepo};

/// One miner's computed settlement share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub miner_pk: String,
    pub share_urtc: u64,
}

/// Weighted floor-division shares of `pot_urtc` across `miners`
/// (`miner_pk`, `weight`), with the integer remainder distributed one unit
/// at a time to the miners sorted by `miner_pk`, lowest first.
pub fn compute_shares(miners: &[(String, f64)], pot_urtc: u64) -> Vec<Share> {
    if miners.is_empty() {
        return Vec::new();
    }
    let total_weight: f64 = miners.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return miners
            .iter()
            .map(|(pk, _)| Share {
                miner_pk: pk.clone(),
                share_urtc: 0,
            })
            .collect();
    }

    let mut sorted: Vec<&(String, f64)> = miners.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut shares: Vec<Share> = sorted
        .iter()
        .map(|(pk, weight)| {
            let share = (pot_urtc as f64 * weight / total_weight).floor() as u64;
            Share {
                miner_pk: pk.clone(),
                share_urtc: share,
            }
        })
        .collect();

    let distributed: u64 = shares.iter().map(|s| s.share_urtc).sum();
    let mut remainder = pot_urtc.saturating_sub(distributed);
    let mut i = 0;
    while remainder > 0 && !shares.is_empty() {
        shares[i % shares.len()].share_urtc += 1;
        remainder -= 1;
        i += 1;
    }

    shares
}

/// Settle every epoch strictly below `current_epoch` that is not yet
/// marked settled. Idempotent: a second call for an already-settled epoch
/// is a no-op (mark_settled/insert_reward are both idempotent at the
/// storage layer).
pub fn settle_due_epochs(
    repo: &EpochRepo<'_>,
    ledger: &LedgerRepo<'_>,
    current_epoch: u64,
    pot_urtc: u64,
    now: i64,
) -> Result<usize, RcError> {
    let due = repo.unsettled_epochs_below(current_epoch)?;
    let mut settled_count = 0;
    for epoch in due {
        if let Err(e) = settle_epoch(repo, ledger, epoch, pot_urtc, now) {
            warn!(epoch, error = %e, "epoch settlement failed, will retry next tick");
            continue;
        }
        settled_count += 1;
    }
    Ok(settled_count)
}

/// Settle one epoch regardless of how it compares to the current epoch —
/// used both by the periodic ticker (via [`settle_due_epochs`]) and by an
/// admin-forced settlement request. A no-op if already settled.
///
/// Reward rows and wallet credits are each applied in their own repo
/// transaction rather than one transaction spanning both aggregates;
/// `insert_reward`'s inserted/ignored result gates the wallet credit so a
/// retried run after a mid-settlement crash cannot double-credit.
pub fn settle_epoch(
    repo: &EpochRepo<'_>,
    ledger: &LedgerRepo<'_>,
    epoch: u64,
    pot_urtc: u64,
    now: i64,
) -> Result<(), RcError> {
    if repo.is_settled(epoch)? {
        return Ok(());
    }
    let miners = repo.enrolled_miners(epoch)?;
    if miners.is_empty() {
        repo.mark_settled(epoch, now)?;
        info!(epoch, "epoch settled with zero distribution, no enrollees");
        return Ok(());
    }

    let shares = compute_shares(&miners, pot_urtc);
    for share in &shares {
        let inserted = repo.insert_reward(epoch, &share.miner_pk, share.share_urtc)?;
        if inserted && share.share_urtc > 0 {
            ledger.credit(&share.miner_pk, share.share_urtc, Some(&share.miner_pk))?;
            ledger.append_entry(now, Some(epoch), &share.miner_pk, share.share_urtc as i64, "epoch_reward")?;
        }
    }
    repo.mark_settled(epoch, now)?;
    info!(epoch, miners = miners.len(), pot_urtc, "epoch settled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustchain_storage::StateDb;

    #[test]
    fn shares_sum_to_pot_with_deterministic_remainder() {
        let miners = vec![
            ("pk_a".to_string(), 3.0),
            ("pk_b".to_string(), 1.5),
            ("pk_c".to_string(), 1.0),
        ];
        let shares = compute_shares(&miners, 1_500_000);
        let total: u64 = shares.iter().map(|s| s.share_urtc).sum();
        assert_eq!(total, 1_500_000);
        let a = shares.iter().find(|s| s.miner_pk == "pk_a").unwrap();
        let b = shares.iter().find(|s| s.miner_pk == "pk_b").unwrap();
        let c = shares.iter().find(|s| s.miner_pk == "pk_c").unwrap();
        assert_eq!(a.share_urtc, 818_182);
        assert_eq!(b.share_urtc, 409_091);
        assert_eq!(c.share_urtc, 272_727);
    }

    #[test]
    fn empty_enrollment_settles_with_zero_distribution() {
        assert!(compute_shares(&[], 1_500_000).is_empty());
    }

    #[test]
    fn settlement_is_idempotent() {
        let db = StateDb::open_in_memory().unwrap();
        let repo = EpochRepo::new(&db);
        let ledger = LedgerRepo::new(&db);
        repo.enroll(0, "pk_a", 3.0).unwrap();
        repo.enroll(0, "pk_b", 1.0).unwrap();

        let first = settle_due_epochs(&repo, &ledger, 1, 1_500_000, 1000).unwrap();
        assert_eq!(first, 1);
        let rewards_first = repo.rewards_for_epoch(0).unwrap();
        let (balance_a, _) = ledger.balance_and_nonce("pk_a").unwrap();
        assert_eq!(balance_a, 1_125_000);

        let second = settle_due_epochs(&repo, &ledger, 1, 1_500_000, 2000).unwrap();
        assert_eq!(second, 0);
        let rewards_second = repo.rewards_for_epoch(0).unwrap();
        assert_eq!(rewards_first, rewards_second);
        let (balance_a_again, _) = ledger.balance_and_nonce("pk_a").unwrap();
        assert_eq!(balance_a_again, 1_125_000);
    }
}
