//! In-memory deterministic state executor.

use crate::ports::outbound::{ExecutionOutcome, StateExecutor};
use parking_lot::RwLock;
use shared_types::{keccak256, Hash, RawTransaction};
use std::collections::HashSet;

const BASE_GAS: u64 = 21_000;
const GAS_PER_PAYLOAD_BYTE: u64 = 16;

struct ExecutorState {
    root: Hash,
    block_number: u64,
    /// Every root this executor has produced; reverting to any of them
    /// is accepted, anything else refused.
    known_roots: HashSet<Hash>,
    snapshots: Vec<(u64, u64, Hash)>,
}

/// Executor that folds each applied transaction into a running Keccak
/// chain: `root' = keccak(root || tx_hash)`. Deterministic, so replaying
/// the same transactions from the same root always reproduces the same
/// final root. Production deployments wire the real state machine behind
/// the same port.
pub struct InMemoryStateExecutor {
    state: RwLock<ExecutorState>,
}

impl InMemoryStateExecutor {
    pub fn new() -> Self {
        let genesis = [0u8; 32];
        let mut known_roots = HashSet::new();
        known_roots.insert(genesis);
        Self {
            state: RwLock::new(ExecutorState {
                root: genesis,
                block_number: 0,
                known_roots,
                snapshots: Vec::new(),
            }),
        }
    }

    /// Snapshots taken so far, as (l2_block, l1_block, root).
    pub fn snapshots(&self) -> Vec<(u64, u64, Hash)> {
        self.state.read().snapshots.clone()
    }
}

impl Default for InMemoryStateExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl StateExecutor for InMemoryStateExecutor {
    fn apply_transaction(&self, tx: &RawTransaction, block_number: u64) -> ExecutionOutcome {
        // An empty sender models a corrupt transaction.
        if tx.from == [0u8; 20] {
            return ExecutionOutcome {
                success: false,
                gas_used: 0,
                error: Some("sender address is null".to_string()),
            };
        }

        let mut state = self.state.write();
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(&state.root);
        preimage.extend_from_slice(&tx.hash());
        let next_root = keccak256(&preimage);
        state.root = next_root;
        state.known_roots.insert(next_root);
        state.block_number = block_number;

        ExecutionOutcome {
            success: true,
            gas_used: BASE_GAS + tx.payload.len() as u64 * GAS_PER_PAYLOAD_BYTE,
            error: None,
        }
    }

    fn state_root(&self) -> Hash {
        self.state.read().root
    }

    fn block_number(&self) -> u64 {
        self.state.read().block_number
    }

    fn revert_to_state_root(&self, root: &Hash) -> bool {
        let mut state = self.state.write();
        if !state.known_roots.contains(root) {
            return false;
        }
        state.root = *root;
        true
    }

    fn set_block_number(&self, block_number: u64) {
        self.state.write().block_number = block_number;
    }

    fn create_snapshot(&self, l2_block: u64, l1_block: u64) {
        let mut state = self.state.write();
        let root = state.root;
        state.snapshots.push((l2_block, l1_block, root));
    }
}
