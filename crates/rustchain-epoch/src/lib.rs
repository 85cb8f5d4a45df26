pub mod clock;
pub mod settlement;
pub mod weight;

pub use clock::ChainClock;
pub use settlement::{compute_shares, settle_due_epochs, settle_epoch, Share};
pub use weight::{enrollment_weight, time_aged_bonus};
