//! Finalized block records and the bounded local history.

use crate::domain::{BlockProposal, Vote, WeightedConsensusResult};
use serde::{Deserialize, Serialize};
use shared_types::Hash;
use std::collections::VecDeque;

/// A block that reached consensus, with the evidence that got it there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedBlock {
    pub proposal: BlockProposal,
    /// The tally at the moment the threshold was crossed.
    pub result: WeightedConsensusResult,
    /// The accepting votes, ordered by voter address.
    pub accepting_votes: Vec<Vote>,
    /// Unix timestamp of finalization.
    pub finalized_at: u64,
}

impl FinalizedBlock {
    pub fn block_hash(&self) -> Hash {
        self.result.block_hash
    }

    pub fn block_number(&self) -> u64 {
        self.proposal.block_number
    }
}

/// Bounded in-memory history of recently finalized blocks.
///
/// When full, the record with the lowest block number is evicted first.
#[derive(Debug, Clone)]
pub struct FinalizedHistory {
    blocks: VecDeque<FinalizedBlock>,
    capacity: usize,
}

impl FinalizedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: VecDeque::with_capacity(capacity.min(128)),
            capacity,
        }
    }

    pub fn push(&mut self, block: FinalizedBlock) {
        while self.blocks.len() >= self.capacity {
            // History is pushed in block order, so the oldest entry is the
            // lowest block number. Scan anyway in case of failover gaps.
            if let Some(min_idx) = self
                .blocks
                .iter()
                .enumerate()
                .min_by_key(|(_, b)| b.block_number())
                .map(|(i, _)| i)
            {
                self.blocks.remove(min_idx);
            }
        }
        self.blocks.push_back(block);
    }

    pub fn latest(&self) -> Option<&FinalizedBlock> {
        self.blocks.back()
    }

    pub fn by_hash(&self, block_hash: &Hash) -> Option<&FinalizedBlock> {
        self.blocks.iter().rev().find(|b| b.block_hash() == *block_hash)
    }

    pub fn by_number(&self, block_number: u64) -> Option<&FinalizedBlock> {
        self.blocks
            .iter()
            .rev()
            .find(|b| b.block_number() == block_number)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinalizedBlock> {
        self.blocks.iter()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalized(block_number: u64) -> FinalizedBlock {
        let proposal = BlockProposal {
            block_number,
            parent_hash: [1u8; 32],
            proposer: [2u8; 20],
            ..Default::default()
        };
        let hash = proposal.content_hash();
        FinalizedBlock {
            proposal,
            result: WeightedConsensusResult::empty(hash, 100),
            accepting_votes: Vec::new(),
            finalized_at: 100,
        }
    }

    #[test]
    fn test_history_evicts_lowest_block_number() {
        let mut history = FinalizedHistory::new(3);
        for n in [10, 11, 12, 13] {
            history.push(finalized(n));
        }
        assert_eq!(history.len(), 3);
        assert!(history.by_number(10).is_none());
        assert!(history.by_number(11).is_some());
        assert_eq!(history.latest().map(|b| b.block_number()), Some(13));
    }

    #[test]
    fn test_lookup_by_hash() {
        let mut history = FinalizedHistory::new(8);
        let block = finalized(5);
        let hash = block.block_hash();
        history.push(block);
        assert_eq!(history.by_hash(&hash).map(|b| b.block_number()), Some(5));
        assert!(history.by_hash(&[0xAA; 32]).is_none());
    }
}
