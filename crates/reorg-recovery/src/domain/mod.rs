//! Domain logic for reorg detection and recovery.

pub mod anchor;
pub mod detection;
pub mod health;
pub mod l1_chain;
pub mod tx_log;

pub use anchor::{AnchorPoint, AnchorSet};
pub use detection::{ReorgDetection, ReorgRecovery, ReplayOutcome};
pub use health::{RecoveryCircuitBreaker, RecoveryEvent, RecoveryState};
pub use l1_chain::{L1BlockInfo, L1History};
pub use tx_log::{TransactionLog, TransactionLogEntry};

use serde::{Deserialize, Serialize};
use shared_types::{ChainId, DEFAULT_L2_CHAIN_ID};

/// Tunable parameters for the reorg recovery service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorgConfig {
    /// L2 chain the anchors belong to.
    pub chain_id: ChainId,
    /// L1 confirmations before an anchor counts as finalized.
    pub finality_depth: u32,
    /// Deepest reorg recovered automatically.
    pub max_reorg_depth: u64,
    /// Minimum L1 spacing expected between anchors; used by the health
    /// check to decide when a missing anchor is suspicious.
    pub min_anchor_interval: u64,
    /// Retention bound on tracked L1 headers.
    pub max_l1_history: usize,
    /// Retention bound on anchors (finalized-only pruning).
    pub max_anchor_points: usize,
    /// Retention bound on the transaction log.
    pub max_tx_log_size: usize,
    /// Retryable revert failures tolerated before halting.
    pub max_retry_attempts: u8,
}

impl Default for ReorgConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_L2_CHAIN_ID,
            finality_depth: 6,
            max_reorg_depth: 100,
            min_anchor_interval: 10,
            max_l1_history: 1_000,
            max_anchor_points: 500,
            max_tx_log_size: 100_000,
            max_retry_attempts: 3,
        }
    }
}
