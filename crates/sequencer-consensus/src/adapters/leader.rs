//! Static round-robin leader schedule.

use crate::ports::outbound::LeaderSelector;
use parking_lot::RwLock;
use shared_types::{Address, Hash};

/// Leader selector over a fixed, ordered committee.
///
/// Slot N maps to `committee[N % len]`. Timeout reports are recorded so
/// the caller (or a test) can inspect failover signals.
pub struct StaticLeaderSelector {
    committee: Vec<Address>,
    reported_timeouts: RwLock<Vec<(u64, Hash)>>,
}

impl StaticLeaderSelector {
    pub fn new(committee: Vec<Address>) -> Self {
        Self {
            committee,
            reported_timeouts: RwLock::new(Vec::new()),
        }
    }

    /// Slot timeouts reported so far, in order.
    pub fn reported_timeouts(&self) -> Vec<(u64, Hash)> {
        self.reported_timeouts.read().clone()
    }
}

impl LeaderSelector for StaticLeaderSelector {
    fn leader_for_slot(&self, slot_number: u64) -> Result<Address, String> {
        if self.committee.is_empty() {
            return Err("leader committee is empty".to_string());
        }
        let idx = (slot_number % self.committee.len() as u64) as usize;
        Ok(self.committee[idx])
    }

    fn report_slot_timeout(&self, slot_number: u64, block_hash: Hash) {
        tracing::warn!(
            slot_number,
            block_hash = ?block_hash,
            "slot timed out, signaling leader failover"
        );
        self.reported_timeouts.write().push((slot_number, block_hash));
    }
}
