use std::sync::Arc;

use tracing::info;

use rustchain_core::error::RcError;
use rustchain_crypto::ed25519::verify_signature;
use rustchain_crypto::hash::address_from_pubkey;
use rustchain_storage::{LedgerRepo, PendingStatus, PendingTransferRow, StateDb};

use crate::preflight::{canonical_transfer_message, validate_signed_transfer};

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub withdrawal_fee_urtc: u64,
    pub min_withdrawal_urtc: u64,
    pub pending_threshold_urtc: u64,
    pub pending_confirm_delay_seconds: i64,
    pub fee_pool_address: String,
}

#[derive(Debug, Clone)]
pub enum TransferResult {
    Executed { from_balance: u64, to_balance: u64 },
    Pending { id: String, confirms_at: i64 },
}

pub struct LedgerService {
    db: Arc<StateDb>,
    config: LedgerConfig,
}

impl LedgerService {
    pub fn new(db: Arc<StateDb>, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// `POST /wallet/transfer/signed`. Ordinary transfers are not fee-bearing
    /// (spec scenario #4: a 1.5 RTC transfer off a 10.0 RTC balance leaves
    /// exactly 8.5 RTC) — only withdrawals charge a fee.
    pub fn transfer_signed(&self, raw: &serde_json::Value, now: i64) -> Result<TransferResult, RcError> {
        self.signed_operation(raw, now, 0, "transfer")
    }

    /// `POST /wallet/withdraw`: identical semantics to a transfer but with
    /// a minimum-amount floor and a distinct ledger reason.
    pub fn withdraw(&self, raw: &serde_json::Value, now: i64) -> Result<TransferResult, RcError> {
        let validated = validate_signed_transfer(raw)?;
        if validated.amount_urtc < self.config.min_withdrawal_urtc {
            return Err(RcError::AmountBelowMinimumWithdrawal {
                min: self.config.min_withdrawal_urtc,
            });
        }
        self.execute_validated(validated, now, self.config.withdrawal_fee_urtc, "withdrawal")
    }

    fn signed_operation(
        &self,
        raw: &serde_json::Value,
        now: i64,
        fee_urtc: u64,
        reason: &str,
    ) -> Result<TransferResult, RcError> {
        let validated = validate_signed_transfer(raw)?;
        self.execute_validated(validated, now, fee_urtc, reason)
    }

    fn execute_validated(
        &self,
        validated: crate::preflight::ValidatedTransfer,
        now: i64,
        fee_urtc: u64,
        reason: &str,
    ) -> Result<TransferResult, RcError> {
        let public_key = hex::decode(&validated.public_key_hex).map_err(|_| RcError::InvalidSignature)?;
        let derived = address_from_pubkey(&public_key);
        if derived.as_str() != validated.from_address {
            return Err(RcError::AddressPubkeyMismatch);
        }

        let signature = hex::decode(&validated.signature_hex).map_err(|_| RcError::InvalidSignature)?;
        let message = canonical_transfer_message(
            &validated.from_address,
            &validated.to_address,
            validated.amount_urtc,
            validated.nonce,
            validated.memo.as_deref(),
        );
        verify_signature(&public_key, &message, &signature).map_err(|_| RcError::InvalidSignature)?;

        let ledger = LedgerRepo::new(&self.db);
        let (_, wallet_nonce) = ledger.balance_and_nonce(&validated.from_address)?;
        if validated.nonce <= wallet_nonce {
            return Err(RcError::NonceStale);
        }

        if validated.amount_urtc >= self.config.pending_threshold_urtc {
            let id = format!("{}-{}", validated.from_address, validated.nonce);
            ledger.insert_pending_transfer(&PendingTransferRow {
                id: id.clone(),
                from_address: validated.from_address.clone(),
                to_address: validated.to_address.clone(),
                amount_urtc: validated.amount_urtc,
                nonce: validated.nonce,
                signature: validated.signature_hex.clone(),
                status: PendingStatus::Pending,
                confirms_at: now + self.config.pending_confirm_delay_seconds,
            })?;
            ledger.bump_nonce(&validated.from_address)?;
            info!(id = %id, amount_urtc = validated.amount_urtc, "transfer held pending (above threshold)");
            return Ok(TransferResult::Pending {
                id,
                confirms_at: now + self.config.pending_confirm_delay_seconds,
            });
        }

        ledger.execute_transfer(
            &validated.from_address,
            &validated.to_address,
            validated.amount_urtc,
            fee_urtc,
            &self.config.fee_pool_address,
            now,
            reason,
        )?;

        let (from_balance, _) = ledger.balance_and_nonce(&validated.from_address)?;
        let (to_balance, _) = ledger.balance_and_nonce(&validated.to_address)?;
        info!(
            from = %validated.from_address,
            to = %validated.to_address,
            amount_urtc = validated.amount_urtc,
            reason,
            "transfer executed"
        );
        Ok(TransferResult::Executed { from_balance, to_balance })
    }

    /// `POST /pending/confirm` (admin): commit every matured pending
    /// transfer. Returns the number confirmed.
    pub fn confirm_matured_pending(&self, now: i64) -> Result<usize, RcError> {
        let ledger = LedgerRepo::new(&self.db);
        let matured = ledger.matured_pending_transfers(now)?;
        let mut confirmed = 0;
        for row in matured {
            ledger.execute_transfer(
                &row.from_address,
                &row.to_address,
                row.amount_urtc,
                0,
                &self.config.fee_pool_address,
                now,
                "transfer",
            )?;
            ledger.set_pending_status(&row.id, PendingStatus::Confirmed)?;
            confirmed += 1;
        }
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustchain_crypto::ed25519::RcSigner;
    use serde_json::json;

    fn config() -> LedgerConfig {
        LedgerConfig {
            withdrawal_fee_urtc: 10_000,
            min_withdrawal_urtc: 10_000,
            pending_threshold_urtc: 100_000_000,
            pending_confirm_delay_seconds: 3600,
            fee_pool_address: "RTCfeepool0000000000000000000000000000000".to_string(),
        }
    }

    #[test]
    fn signed_transfer_executes_fee_free() {
        let db = Arc::new(StateDb::open_in_memory().unwrap());
        let signer = RcSigner::generate();
        let from = address_from_pubkey(&signer.public_key_bytes);

        let ledger = LedgerRepo::new(&db);
        ledger.credit(from.as_str(), 10_000_000, None).unwrap();
        ledger.bump_nonce(from.as_str()).unwrap();
        ledger.bump_nonce(from.as_str()).unwrap();
        ledger.bump_nonce(from.as_str()).unwrap(); // wallet_nonce now 3

        let to = "RTC".to_string() + &"b".repeat(40);
        let message = canonical_transfer_message(from.as_str(), &to, 1_500_000, 4, None);
        let signature = signer.sign(&message);

        let body = json!({
            "from_address": from.as_str(),
            "to_address": to,
            "amount_rtc": 1.5,
            "nonce": 4,
            "signature": hex::encode(signature),
            "public_key": hex::encode(signer.public_key_bytes)
        });

        let service = LedgerService::new(db.clone(), config());
        let result = service.transfer_signed(&body, 1000).unwrap();
        match result {
            TransferResult::Executed { from_balance, to_balance } => {
                assert_eq!(from_balance, 8_500_000);
                assert_eq!(to_balance, 1_500_000);
            }
            other => panic!("expected Executed, got {other:?}"),
        }
    }

    #[test]
    fn stale_nonce_rejected() {
        let db = Arc::new(StateDb::open_in_memory().unwrap());
        let signer = RcSigner::generate();
        let from = address_from_pubkey(&signer.public_key_bytes);
        let ledger = LedgerRepo::new(&db);
        ledger.credit(from.as_str(), 1_000_000, None).unwrap();
        ledger.bump_nonce(from.as_str()).unwrap(); // wallet_nonce now 1

        let to = "RTC".to_string() + &"b".repeat(40);
        let message = canonical_transfer_message(from.as_str(), &to, 500_000, 1, None);
        let signature = signer.sign(&message);
        let body = json!({
            "from_address": from.as_str(),
            "to_address": to,
            "amount_rtc": 0.5,
            "nonce": 1,
            "signature": hex::encode(signature),
            "public_key": hex::encode(signer.public_key_bytes)
        });

        let service = LedgerService::new(db, config());
        let err = service.transfer_signed(&body, 1000).unwrap_err();
        assert!(matches!(err, RcError::NonceStale));
    }

    #[test]
    fn address_pubkey_mismatch_rejected() {
        let db = Arc::new(StateDb::open_in_memory().unwrap());
        let signer = RcSigner::generate();
        let wrong_from = "RTC".to_string() + &"c".repeat(40);
        let to = "RTC".to_string() + &"b".repeat(40);
        let message = canonical_transfer_message(&wrong_from, &to, 500_000, 1, None);
        let signature = signer.sign(&message);
        let body = json!({
            "from_address": wrong_from,
            "to_address": to,
            "amount_rtc": 0.5,
            "nonce": 1,
            "signature": hex::encode(signature),
            "public_key": hex::encode(signer.public_key_bytes)
        });

        let service = LedgerService::new(db, config());
        let err = service.transfer_signed(&body, 1000).unwrap_err();
        assert!(matches!(err, RcError::AddressPubkeyMismatch));
    }
}
