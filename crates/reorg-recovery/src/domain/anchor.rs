//! L2-to-L1 anchor points.

use serde::{Deserialize, Serialize};
use shared_types::Hash;
use std::collections::BTreeMap;

/// A commitment of an L2 state root recorded on L1.
///
/// `is_finalized` is monotone: once true it never reverts to false while
/// the anchor exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub l1_block_number: u64,
    pub l1_block_hash: Hash,
    pub l2_block_number: u64,
    pub l2_state_root: Hash,
    pub batch_hash: Hash,
    pub timestamp: u64,
    pub is_finalized: bool,
}

/// Anchor history, strictly ordered by L1 block number.
///
/// Pruning only ever removes *finalized* anchors, oldest first, and stops
/// at the first non-finalized one: an unfinalized anchor may still be
/// needed for a future reversion.
#[derive(Debug, Clone)]
pub struct AnchorSet {
    anchors: BTreeMap<u64, AnchorPoint>,
    capacity: usize,
}

impl AnchorSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            anchors: BTreeMap::new(),
            capacity,
        }
    }

    /// Record an anchor and prune finalized anchors beyond capacity.
    pub fn insert(&mut self, anchor: AnchorPoint) {
        self.anchors.insert(anchor.l1_block_number, anchor);
        while self.anchors.len() > self.capacity {
            let oldest_finalized = self
                .anchors
                .iter()
                .next()
                .filter(|(_, anchor)| anchor.is_finalized)
                .map(|(number, _)| *number);
            match oldest_finalized {
                Some(number) => {
                    self.anchors.remove(&number);
                }
                None => break,
            }
        }
    }

    pub fn get(&self, l1_block_number: u64) -> Option<&AnchorPoint> {
        self.anchors.get(&l1_block_number)
    }

    /// Highest anchor strictly below the given L1 block.
    pub fn last_valid_before(&self, l1_block_number: u64) -> Option<&AnchorPoint> {
        self.anchors
            .range(..l1_block_number)
            .next_back()
            .map(|(_, anchor)| anchor)
    }

    /// Highest finalized anchor, if any.
    pub fn latest_finalized(&self) -> Option<&AnchorPoint> {
        self.anchors
            .values()
            .rev()
            .find(|anchor| anchor.is_finalized)
    }

    /// Mark every anchor buried `finality_depth` blocks under the tip.
    pub fn finalize_up_to(&mut self, tip_block_number: u64, finality_depth: u32) {
        for (l1_block, anchor) in self.anchors.iter_mut() {
            if !anchor.is_finalized
                && tip_block_number >= l1_block + u64::from(finality_depth)
            {
                anchor.is_finalized = true;
            }
        }
    }

    /// Mark a single anchor finalized once it has enough confirmations.
    pub fn finalize_at(&mut self, l1_block_number: u64, confirmations: u32, finality_depth: u32) {
        if confirmations >= finality_depth {
            if let Some(anchor) = self.anchors.get_mut(&l1_block_number) {
                anchor.is_finalized = true;
            }
        }
    }

    /// Delete all anchors strictly above `fork_point`.
    pub fn remove_after(&mut self, fork_point: u64) {
        self.anchors.split_off(&(fork_point + 1));
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorPoint> {
        self.anchors.values()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn finalized_count(&self) -> usize {
        self.anchors.values().filter(|a| a.is_finalized).count()
    }

    pub fn clear(&mut self) {
        self.anchors.clear();
    }
}
