pub mod preflight;
pub mod service;

pub use preflight::{canonical_transfer_message, validate_signed_transfer, ValidatedTransfer};
pub use service::{LedgerConfig, LedgerService, TransferResult};
