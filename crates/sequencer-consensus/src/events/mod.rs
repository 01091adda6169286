//! Events delivered to consensus observers.

use crate::domain::{FinalizedBlock, WeightedConsensusResult};
use serde::{Deserialize, Serialize};
use shared_types::Hash;

/// Delivered when a block reaches the weighted threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockFinalizedEvent {
    pub block: FinalizedBlock,
    pub finalized_at: u64,
}

impl BlockFinalizedEvent {
    pub fn block_hash(&self) -> Hash {
        self.block.block_hash()
    }

    pub fn block_number(&self) -> u64 {
        self.block.block_number()
    }
}

/// Delivered when a round ends without consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusFailedEvent {
    pub block_hash: Hash,
    pub reason: String,
    /// The tally at the moment the round failed.
    pub result: WeightedConsensusResult,
    pub failed_at: u64,
}
