//! Driving ports (inbound API).

use crate::domain::{
    AnchorPoint, L1BlockInfo, RecoveryState, ReorgDetection, ReorgRecovery, ReplayOutcome,
    TransactionLogEntry,
};
use crate::error::ReorgResult;
use crate::ports::outbound::ReorgObserver;
use serde::{Deserialize, Serialize};
use shared_types::{ChainId, Hash};
use std::sync::Arc;

/// Snapshot of the service's counters and health, for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorgStatistics {
    pub chain_id: ChainId,
    pub finality_depth: u32,
    pub current_l1_tip: u64,
    pub l1_blocks_tracked: usize,
    pub anchor_points: usize,
    pub finalized_anchors: usize,
    pub transaction_logs: usize,
    pub observers: usize,
    pub recovery_state: RecoveryState,
    pub consecutive_failures: u64,
    pub reorgs_detected: u64,
    pub reorgs_recovered: u64,
    pub transactions_replayed: u64,
    pub transactions_failed: u64,
}

/// Primary reorg recovery API.
///
/// All operations are synchronous and safe to call from multiple threads;
/// the implementation serializes access internally. The caller guarantees
/// ordering across components: an anchor must be added before a reorg can
/// revert to it.
pub trait ReorgRecoveryApi: Send + Sync {
    /// Ingest one newly observed L1 header.
    ///
    /// Returns the detection when this header confirms a reorg, `None`
    /// for a normal extension. Detection failures (depth over the bound,
    /// no recoverable fork point) leave all tracked state untouched.
    fn process_l1_block(&self, block: L1BlockInfo) -> ReorgResult<Option<ReorgDetection>>;

    /// Compare a candidate tip against the tracked chain without
    /// mutating anything.
    fn check_for_reorg(&self, new_tip: &L1BlockInfo) -> ReorgResult<Option<ReorgDetection>>;

    /// Revert state to the most recent anchor strictly below `fork_point`
    /// and delete all history and anchors above it. All-or-nothing: a
    /// failed revert deletes nothing, so the call can be retried.
    fn revert_to_last_valid_anchor(&self, fork_point: u64) -> ReorgResult<AnchorPoint>;

    /// Re-apply logged transactions in `[from_block, to_block]` in their
    /// original order. Best-effort: per-entry failures are counted, not
    /// fatal.
    fn replay_transactions(&self, from_block: u64, to_block: u64) -> ReplayOutcome;

    /// Full recovery for a confirmed detection: revert, replay, update
    /// the tip, notify observers.
    fn handle_reorg(&self, detection: &ReorgDetection) -> ReorgResult<ReorgRecovery>;

    /// Record a new anchor, snapshotting executor state.
    fn add_anchor_point(&self, anchor: AnchorPoint);

    /// Mark an anchor finalized once it has enough confirmations.
    fn update_anchor_finalization(&self, l1_block_number: u64, confirmations: u32);

    fn is_anchor_finalized(&self, l1_block_number: u64) -> bool;

    /// Most recent anchor strictly below the given L1 block.
    fn last_valid_anchor(&self, before_l1_block: u64) -> Option<AnchorPoint>;

    /// Highest finalized anchor.
    fn latest_finalized_anchor(&self) -> Option<AnchorPoint>;

    /// All anchors, ordered by L1 block number.
    fn anchor_points(&self) -> Vec<AnchorPoint>;

    /// Append a transaction to the replay log.
    fn log_transaction(&self, entry: TransactionLogEntry);

    /// Look up one logged transaction.
    fn transaction_log(&self, tx_hash: &Hash) -> Option<TransactionLogEntry>;

    /// Logged entries in an L2 block range, replay-ordered.
    fn transactions_in_range(&self, from_block: u64, to_block: u64) -> Vec<TransactionLogEntry>;

    /// Drop log entries below `before_block`; returns how many went.
    fn prune_transaction_logs(&self, before_block: u64) -> usize;

    /// The tracked L1 tip, if any header has been ingested.
    fn current_l1_tip(&self) -> Option<L1BlockInfo>;

    /// A tracked L1 header by height.
    fn l1_block(&self, block_number: u64) -> Option<L1BlockInfo>;

    /// Register an observer for completed recoveries.
    fn register_observer(&self, observer: Arc<dyn ReorgObserver>);

    /// Counters and health snapshot.
    fn statistics(&self) -> ReorgStatistics;

    /// False once the component needs attention: halted recovery, or no
    /// anchors long after startup.
    fn is_healthy(&self) -> bool;

    /// Current recovery circuit-breaker state.
    fn recovery_state(&self) -> RecoveryState;

    /// Operator acknowledgment that a halt has been handled.
    fn manual_reset(&self);

    /// Drop all tracked history, anchors, logs, and observers.
    fn clear(&self);
}
