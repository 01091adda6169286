//! Sequencer votes on block proposals.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Keccak256};
use shared_types::{Address, Hash, Signature};

/// The value of a sequencer vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteValue {
    Accept,
    Reject,
    Abstain,
}

impl std::fmt::Display for VoteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteValue::Accept => write!(f, "ACCEPT"),
            VoteValue::Reject => write!(f, "REJECT"),
            VoteValue::Abstain => write!(f, "ABSTAIN"),
        }
    }
}

/// A vote on a block proposal from one committee member.
///
/// Exactly one vote per (voter, block hash) is recorded; duplicates are
/// rejected and never overwrite the first vote.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Hash of the proposal being voted on.
    pub block_hash: Hash,
    /// Address of the voting sequencer.
    pub voter: Address,
    /// Accept, Reject, or Abstain.
    pub value: VoteValue,
    /// Human-readable reason, set when the vote is a rejection.
    pub reject_reason: Option<String>,
    /// Unix timestamp of the vote.
    pub timestamp: u64,
    /// Slot number this vote is for.
    pub slot_number: u64,
    /// Voter signature over `signing_hash()`.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Vote {
    /// Digest the voter signs over. Excludes the signature itself.
    pub fn signing_hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(self.block_hash);
        hasher.update(self.voter);
        hasher.update([self.vote_tag()]);
        if let Some(reason) = &self.reject_reason {
            hasher.update(reason.as_bytes());
        }
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.slot_number.to_le_bytes());
        hasher.finalize().into()
    }

    fn vote_tag(&self) -> u8 {
        match self.value {
            VoteValue::Accept => 0,
            VoteValue::Reject => 1,
            VoteValue::Abstain => 2,
        }
    }

    pub fn is_accept(&self) -> bool {
        self.value == VoteValue::Accept
    }

    pub fn is_reject(&self) -> bool {
        self.value == VoteValue::Reject
    }

    pub fn is_abstain(&self) -> bool {
        self.value == VoteValue::Abstain
    }
}
