//! Driven ports (outbound dependencies).

use crate::events::ReorgEvent;
use shared_types::{Hash, RawTransaction};

/// Result of applying one transaction through the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub gas_used: u64,
    pub error: Option<String>,
}

/// Versioned L2 state execution.
///
/// The executor owns the state; this component only directs it. A failed
/// revert leaves the executor untouched, so recovery can retry.
pub trait StateExecutor: Send + Sync {
    /// Apply one transaction at the given L2 block number.
    fn apply_transaction(&self, tx: &RawTransaction, block_number: u64) -> ExecutionOutcome;

    /// Current state root.
    fn state_root(&self) -> Hash;

    /// Current L2 block number.
    fn block_number(&self) -> u64;

    /// Revert to a previously produced root. Returns false when the root
    /// is unknown or the revert cannot be performed.
    fn revert_to_state_root(&self, root: &Hash) -> bool;

    /// Reposition the executor's block counter after a revert.
    fn set_block_number(&self, block_number: u64);

    /// Snapshot current state keyed by (L2 block, L1 anchor block).
    fn create_snapshot(&self, l2_block: u64, l1_block: u64);
}

/// Observer for completed reorg recoveries.
///
/// Callbacks run synchronously after the service lock is released,
/// against a snapshot of the observer list; a panicking observer is
/// logged and does not disturb recovery or other observers.
pub trait ReorgObserver: Send + Sync {
    fn on_reorg(&self, event: &ReorgEvent);
}
