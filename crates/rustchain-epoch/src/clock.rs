use rustchain_core::types::{Epoch, Slot, Timestamp};

/// Chain clock parameters, read once at boot from env/config.
#[derive(Debug, Clone, Copy)]
pub struct ChainClock {
    pub genesis_timestamp: Timestamp,
    pub block_time_seconds: i64,
    pub epoch_slots: u64,
}

impl ChainClock {
    pub fn current_slot(&self, now: Timestamp) -> Slot {
        let elapsed = (now - self.genesis_timestamp).max(0);
        (elapsed / self.block_time_seconds) as u64
    }

    pub fn current_epoch(&self, now: Timestamp) -> Epoch {
        self.current_slot(now) / self.epoch_slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> ChainClock {
        ChainClock {
            genesis_timestamp: 1_000_000,
            block_time_seconds: 600,
            epoch_slots: 144,
        }
    }

    #[test]
    fn before_genesis_clamps_to_slot_zero() {
        let c = clock();
        assert_eq!(c.current_slot(0), 0);
        assert_eq!(c.current_epoch(0), 0);
    }

    #[test]
    fn slot_and_epoch_advance_with_time() {
        let c = clock();
        let now = c.genesis_timestamp + 600 * 144 * 3 + 600 * 10;
        assert_eq!(c.current_slot(now), 144 * 3 + 10);
        assert_eq!(c.current_epoch(now), 3);
    }
}
