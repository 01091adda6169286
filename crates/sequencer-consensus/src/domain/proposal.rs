//! Block proposals from the leader sequencer.

use crate::domain::ConsensusConfig;
use crate::error::{ConsensusError, ConsensusResult};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Keccak256};
use shared_types::{Address, ChainId, Hash, Signature, DEFAULT_L2_CHAIN_ID};

/// A block proposal from the current leader.
///
/// Contains everything committee members need to validate and vote.
/// Immutable once created; identified by its content hash, which excludes
/// the proposer signature so the digest doubles as the signing message.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProposal {
    /// L2 block number.
    pub block_number: u64,
    /// Hash of the parent L2 block.
    pub parent_hash: Hash,
    /// State root after applying all transactions in this block.
    pub state_root: Hash,
    /// Merkle root of the included transactions.
    pub transactions_root: Hash,
    /// Hashes of the transactions included in this block.
    pub transaction_hashes: Vec<Hash>,
    /// Address of the proposing sequencer (leader).
    pub proposer: Address,
    /// Unix timestamp when the block was proposed.
    pub timestamp: u64,
    /// L2 chain ID this proposal belongs to.
    pub chain_id: ChainId,
    /// Gas limit for this block.
    pub gas_limit: u64,
    /// Gas used by the included transactions.
    pub gas_used: u64,
    /// Slot number this proposal is for.
    pub slot_number: u64,
    /// Proposer signature over `content_hash()`.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Default for BlockProposal {
    fn default() -> Self {
        Self {
            block_number: 0,
            parent_hash: [0u8; 32],
            state_root: [0u8; 32],
            transactions_root: [0u8; 32],
            transaction_hashes: Vec::new(),
            proposer: [0u8; 20],
            timestamp: 0,
            chain_id: DEFAULT_L2_CHAIN_ID,
            gas_limit: 30_000_000,
            gas_used: 0,
            slot_number: 0,
            signature: [0u8; 64],
        }
    }
}

impl BlockProposal {
    /// Compute the content hash of this proposal.
    ///
    /// The signature is excluded, so this hash is also the signing digest.
    pub fn content_hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(self.block_number.to_le_bytes());
        hasher.update(self.parent_hash);
        hasher.update(self.state_root);
        hasher.update(self.transactions_root);
        for tx_hash in &self.transaction_hashes {
            hasher.update(tx_hash);
        }
        hasher.update(self.proposer);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.chain_id.to_le_bytes());
        hasher.update(self.gas_limit.to_le_bytes());
        hasher.update(self.gas_used.to_le_bytes());
        hasher.update(self.slot_number.to_le_bytes());
        hasher.finalize().into()
    }

    /// Digest the proposer signs over.
    pub fn signing_hash(&self) -> Hash {
        self.content_hash()
    }

    /// Whether a signature has been attached.
    pub fn is_signed(&self) -> bool {
        self.signature != [0u8; 64]
    }

    /// Validate the basic structure of the proposal.
    ///
    /// Checks parent linkage for non-genesis blocks, forward timestamp
    /// drift, gas accounting, and a non-null proposer.
    pub fn validate_structure(&self, now: u64, config: &ConsensusConfig) -> ConsensusResult<()> {
        if self.block_number > 0 && self.parent_hash == [0u8; 32] {
            return Err(ConsensusError::MalformedProposal {
                reason: format!("block {} has no parent hash", self.block_number),
            });
        }

        if self.timestamp > now + config.max_proposal_drift_secs {
            return Err(ConsensusError::TimestampTooFarInFuture {
                timestamp: self.timestamp,
                now,
                max_drift: config.max_proposal_drift_secs,
            });
        }

        if self.gas_used > self.gas_limit {
            return Err(ConsensusError::MalformedProposal {
                reason: format!("gas used {} exceeds limit {}", self.gas_used, self.gas_limit),
            });
        }

        if self.proposer == [0u8; 20] {
            return Err(ConsensusError::MalformedProposal {
                reason: "proposer address is null".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> BlockProposal {
        BlockProposal {
            block_number: 5,
            parent_hash: [1u8; 32],
            proposer: [2u8; 20],
            timestamp: 1_000,
            slot_number: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_content_hash_excludes_signature() {
        let unsigned = proposal();
        let mut signed = proposal();
        signed.signature = [9u8; 64];
        assert_eq!(unsigned.content_hash(), signed.content_hash());
    }

    #[test]
    fn test_content_hash_covers_block_number() {
        let mut other = proposal();
        other.block_number += 1;
        assert_ne!(proposal().content_hash(), other.content_hash());
    }

    #[test]
    fn test_structure_rejects_missing_parent() {
        let mut p = proposal();
        p.parent_hash = [0u8; 32];
        let err = p.validate_structure(1_000, &ConsensusConfig::default());
        assert!(matches!(err, Err(ConsensusError::MalformedProposal { .. })));
    }

    #[test]
    fn test_structure_rejects_future_timestamp() {
        let config = ConsensusConfig::default();
        let mut p = proposal();
        p.timestamp = 1_000 + config.max_proposal_drift_secs + 1;
        let err = p.validate_structure(1_000, &config);
        assert!(matches!(
            err,
            Err(ConsensusError::TimestampTooFarInFuture { .. })
        ));
    }

    #[test]
    fn test_structure_rejects_gas_overflow() {
        let mut p = proposal();
        p.gas_used = p.gas_limit + 1;
        assert!(p.validate_structure(1_000, &ConsensusConfig::default()).is_err());
    }

    #[test]
    fn test_structure_accepts_genesis_without_parent() {
        let mut p = proposal();
        p.block_number = 0;
        p.parent_hash = [0u8; 32];
        assert!(p.validate_structure(1_000, &ConsensusConfig::default()).is_ok());
    }
}
