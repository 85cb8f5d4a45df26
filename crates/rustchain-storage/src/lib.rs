pub mod db;
pub mod epoch_repo;
pub mod ledger_repo;
pub mod miner_repo;
pub mod p2p_repo;

pub use db::StateDb;
pub use epoch_repo::EpochRepo;
pub use ledger_repo::{LedgerRepo, PendingStatus, PendingTransferRow};
pub use miner_repo::{AttestationRow, MinerRepo};
pub use p2p_repo::{P2pRepo, PeerKeyRow};
