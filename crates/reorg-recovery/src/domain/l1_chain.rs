//! Tracked L1 header history and fork-point search.

use serde::{Deserialize, Serialize};
use shared_types::Hash;
use std::collections::BTreeMap;

/// One observed L1 block header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1BlockInfo {
    pub block_number: u64,
    pub block_hash: Hash,
    pub prev_block_hash: Hash,
    pub timestamp: u64,
    pub confirmations: u32,
}

impl L1BlockInfo {
    pub fn new(
        block_number: u64,
        block_hash: Hash,
        prev_block_hash: Hash,
        timestamp: u64,
        confirmations: u32,
    ) -> Self {
        Self {
            block_number,
            block_hash,
            prev_block_hash,
            timestamp,
            confirmations,
        }
    }

    /// Whether this block directly extends `tip`.
    pub fn extends(&self, tip: &L1BlockInfo) -> bool {
        self.block_number == tip.block_number + 1 && self.prev_block_hash == tip.block_hash
    }
}

/// Bounded, block-number-ordered history of observed L1 headers.
///
/// The tracked tip is stored separately from the map: on a reorg the map
/// may briefly hold the superseded entry at the same height until the
/// recovery path deletes everything above the fork point.
#[derive(Debug, Clone)]
pub struct L1History {
    blocks: BTreeMap<u64, L1BlockInfo>,
    tip: Option<L1BlockInfo>,
    capacity: usize,
}

impl L1History {
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: BTreeMap::new(),
            tip: None,
            capacity,
        }
    }

    /// Store a header, overwriting any prior entry at that height, and
    /// drop the oldest entries beyond capacity.
    pub fn insert(&mut self, block: L1BlockInfo) {
        self.blocks.insert(block.block_number, block);
        while self.blocks.len() > self.capacity {
            self.blocks.pop_first();
        }
    }

    pub fn get(&self, block_number: u64) -> Option<&L1BlockInfo> {
        self.blocks.get(&block_number)
    }

    pub fn tip(&self) -> Option<&L1BlockInfo> {
        self.tip.as_ref()
    }

    pub fn set_tip(&mut self, tip: L1BlockInfo) {
        self.tip = Some(tip);
    }

    /// Delete all entries strictly above `fork_point`.
    pub fn remove_after(&mut self, fork_point: u64) {
        self.blocks.split_off(&(fork_point + 1));
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.tip = None;
    }

    /// Locate the last common point of the old and new chains.
    ///
    /// Walks down from `min(old_height, new_height)` through tracked
    /// history looking for a height strictly below both tips. A candidate
    /// that is provably not an ancestor of the new tip (it sits directly
    /// under the new tip but its hash does not match the new tip's parent)
    /// is skipped and the walk continues downward. Returns the fork point
    /// and whether the linkage to the new tip was positively verified.
    pub fn find_fork_point(
        &self,
        old_tip: &L1BlockInfo,
        new_tip: &L1BlockInfo,
    ) -> Option<(u64, bool)> {
        let old_height = old_tip.block_number;
        let new_height = new_tip.block_number;
        let mut check_height = old_height.min(new_height);

        while check_height > 0 {
            if let Some(candidate) = self.blocks.get(&check_height) {
                if check_height < old_height && check_height < new_height {
                    let directly_under_new = check_height + 1 == new_height;
                    if directly_under_new && candidate.block_hash != new_tip.prev_block_hash {
                        // Provably on the old branch, keep walking.
                        check_height -= 1;
                        continue;
                    }
                    let verified =
                        directly_under_new && candidate.block_hash == new_tip.prev_block_hash;
                    return Some((check_height, verified));
                }
            }
            check_height -= 1;
        }

        // Deep fork: everything we still track may be above the true fork
        // point. Fall back to the oldest block we know of, unverified.
        self.blocks.keys().next().map(|number| (*number, false))
    }
}
