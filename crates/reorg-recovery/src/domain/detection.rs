//! Reorg detection and recovery result types.

use crate::domain::L1BlockInfo;
use serde::{Deserialize, Serialize};
use shared_types::Hash;

/// A confirmed L1 reorganization, computed per header ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorgDetection {
    /// Blocks between the old tip and the fork point.
    pub reorg_depth: u64,
    /// Last L1 height both chains agree on.
    pub fork_point: u64,
    /// Hash of the fork-point block in tracked history.
    pub fork_point_hash: Hash,
    /// Whether the fork point's linkage to the new tip was positively
    /// verified against tracked history.
    pub fork_point_verified: bool,
    pub old_tip: L1BlockInfo,
    pub new_tip: L1BlockInfo,
}

/// Outcome of a completed recovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorgRecovery {
    pub new_state_root: Hash,
    pub new_l2_block_number: u64,
    pub transactions_replayed: usize,
    pub transactions_failed: usize,
    /// Every transaction logged at or after the reverted anchor's block.
    pub affected_transactions: Vec<Hash>,
}

/// Replay counters for a best-effort batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub replayed: usize,
    pub failed: usize,
}
