//! Append-only transaction log supporting replay and audit.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::{Hash, RawTransaction};
use std::collections::{BTreeMap, HashMap};

/// One logged L2 transaction, with the serialized payload needed to
/// re-apply it during replay.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub tx_hash: Hash,
    #[serde_as(as = "Bytes")]
    pub tx_data: Vec<u8>,
    pub l2_block_number: u64,
    /// L1 block of the anchor covering this transaction.
    pub l1_anchor_block: u64,
    pub timestamp: u64,
    pub was_successful: bool,
    pub gas_used: u64,
}

impl TransactionLogEntry {
    pub fn for_transaction(
        tx: &RawTransaction,
        l2_block_number: u64,
        l1_anchor_block: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            tx_hash: tx.hash(),
            tx_data: tx.encode(),
            l2_block_number,
            l1_anchor_block,
            timestamp,
            was_successful: false,
            gas_used: 0,
        }
    }

    /// Deserialize the logged payload back into a transaction.
    pub fn decode_transaction(&self) -> Result<RawTransaction, bincode::Error> {
        RawTransaction::decode(&self.tx_data)
    }
}

/// Bounded transaction log, indexed by hash and by L2 block.
///
/// When the log exceeds capacity, whole oldest-block groups are pruned
/// so replay never sees a partially retained block.
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    by_hash: HashMap<Hash, TransactionLogEntry>,
    by_block: BTreeMap<u64, Vec<Hash>>,
    capacity: usize,
}

impl TransactionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            by_hash: HashMap::new(),
            by_block: BTreeMap::new(),
            capacity,
        }
    }

    pub fn insert(&mut self, entry: TransactionLogEntry) {
        self.by_block
            .entry(entry.l2_block_number)
            .or_default()
            .push(entry.tx_hash);
        self.by_hash.insert(entry.tx_hash, entry);

        if self.by_hash.len() > self.capacity {
            if let Some(oldest_block) = self.by_block.keys().next().copied() {
                self.prune_before(oldest_block + 1);
            }
        }
    }

    pub fn get(&self, tx_hash: &Hash) -> Option<&TransactionLogEntry> {
        self.by_hash.get(tx_hash)
    }

    /// Record the outcome of a replayed transaction back into the log.
    pub fn record_outcome(&mut self, tx_hash: &Hash, was_successful: bool, gas_used: u64) {
        if let Some(entry) = self.by_hash.get_mut(tx_hash) {
            entry.was_successful = was_successful;
            entry.gas_used = gas_used;
        }
    }

    /// Entries with `from_block <= l2_block_number <= to_block`, sorted by
    /// (block number, timestamp) so replay preserves original ordering
    /// even if ingestion order differed.
    pub fn range(&self, from_block: u64, to_block: u64) -> Vec<TransactionLogEntry> {
        let mut entries: Vec<TransactionLogEntry> = self
            .by_block
            .range(from_block..=to_block)
            .flat_map(|(_, hashes)| hashes.iter())
            .filter_map(|hash| self.by_hash.get(hash).cloned())
            .collect();
        entries.sort_by_key(|entry| (entry.l2_block_number, entry.timestamp));
        entries
    }

    /// All entries from `from_block` onward, replay-ordered.
    pub fn from_block(&self, from_block: u64) -> Vec<TransactionLogEntry> {
        self.range(from_block, u64::MAX)
    }

    /// Hashes of every transaction logged at or after `from_block`.
    pub fn hashes_from_block(&self, from_block: u64) -> Vec<Hash> {
        self.by_block
            .range(from_block..)
            .flat_map(|(_, hashes)| hashes.iter().copied())
            .collect()
    }

    /// Drop all entries below `before_block`; returns how many went.
    pub fn prune_before(&mut self, before_block: u64) -> usize {
        let mut pruned = 0;
        let keep = self.by_block.split_off(&before_block);
        let dropped = std::mem::replace(&mut self.by_block, keep);
        for hashes in dropped.values() {
            for hash in hashes {
                if self.by_hash.remove(hash).is_some() {
                    pruned += 1;
                }
            }
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_hash.clear();
        self.by_block.clear();
    }
}
