//! Per-proposal round state machine.
//!
//! ```text
//! [WAITING_FOR_PROPOSAL] ──proposal accepted──→ [COLLECTING_VOTES]
//!          ↑                                          │
//!          │            threshold reached ──→ [CONSENSUS_REACHED]
//!          │                                          │
//!          │       rejects make threshold unreachable │
//!          │                        └──→ [CONSENSUS_FAILED] ──→ [FAILOVER_IN_PROGRESS]
//!          │                                          │                 │
//!          └──────────────────────────────────────────┴─────────────────┘
//! ```
//!
//! Timeouts are driven by the caller: the round only records when it
//! opened and answers elapsed-time queries.

use crate::domain::{BlockProposal, Vote};
use crate::error::{ConsensusError, ConsensusResult};
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};
use std::collections::HashMap;

/// Consensus state for the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsensusState {
    /// No proposal in flight.
    #[default]
    WaitingForProposal,
    /// A proposal was accepted and votes are being collected.
    CollectingVotes,
    /// The threshold was reached and the block finalized.
    ConsensusReached,
    /// The round terminated without reaching the threshold.
    ConsensusFailed,
    /// Failover to the next eligible leader has been signaled.
    FailoverInProgress,
}

impl std::fmt::Display for ConsensusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusState::WaitingForProposal => write!(f, "WAITING_FOR_PROPOSAL"),
            ConsensusState::CollectingVotes => write!(f, "COLLECTING_VOTES"),
            ConsensusState::ConsensusReached => write!(f, "CONSENSUS_REACHED"),
            ConsensusState::ConsensusFailed => write!(f, "CONSENSUS_FAILED"),
            ConsensusState::FailoverInProgress => write!(f, "FAILOVER_IN_PROGRESS"),
        }
    }
}

/// The in-flight voting round: one proposal plus the votes collected for it.
///
/// Votes are keyed by voter address; the first vote from a voter wins and
/// later ones are rejected as duplicates.
#[derive(Debug, Clone)]
pub struct VotingRound {
    proposal: BlockProposal,
    proposal_hash: Hash,
    votes: HashMap<Address, Vote>,
    /// Unix timestamp when the proposal was accepted.
    opened_at: u64,
    /// Cap on stored votes for this round.
    max_votes: usize,
}

impl VotingRound {
    pub fn new(proposal: BlockProposal, opened_at: u64, max_votes: usize) -> Self {
        let proposal_hash = proposal.content_hash();
        Self {
            proposal,
            proposal_hash,
            votes: HashMap::new(),
            opened_at,
            max_votes,
        }
    }

    pub fn proposal(&self) -> &BlockProposal {
        &self.proposal
    }

    pub fn proposal_hash(&self) -> Hash {
        self.proposal_hash
    }

    pub fn opened_at(&self) -> u64 {
        self.opened_at
    }

    /// Seconds elapsed since the round opened, per the caller's clock.
    pub fn elapsed_secs(&self, now: u64) -> u64 {
        now.saturating_sub(self.opened_at)
    }

    /// Record a vote for this round's proposal.
    ///
    /// Rejects votes for other block hashes and duplicate voters.
    pub fn record_vote(&mut self, vote: Vote) -> ConsensusResult<()> {
        if vote.block_hash != self.proposal_hash {
            return Err(ConsensusError::NoMatchingProposal {
                block_hash: vote.block_hash,
            });
        }
        if self.votes.contains_key(&vote.voter) {
            return Err(ConsensusError::DuplicateVote {
                voter: vote.voter,
                block_hash: vote.block_hash,
            });
        }
        if self.votes.len() >= self.max_votes {
            return Err(ConsensusError::VoteSetFull {
                limit: self.max_votes,
            });
        }
        self.votes.insert(vote.voter, vote);
        Ok(())
    }

    /// All votes recorded so far.
    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// The accepting votes, for inclusion in the finalized block.
    pub fn accepting_votes(&self) -> Vec<Vote> {
        let mut accepts: Vec<Vote> = self.votes.values().filter(|v| v.is_accept()).cloned().collect();
        accepts.sort_by(|a, b| a.voter.cmp(&b.voter));
        accepts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VoteValue;

    fn round() -> VotingRound {
        let proposal = BlockProposal {
            block_number: 1,
            parent_hash: [1u8; 32],
            proposer: [2u8; 20],
            timestamp: 50,
            ..Default::default()
        };
        VotingRound::new(proposal, 100, 16)
    }

    fn vote_for(round: &VotingRound, voter: u8, value: VoteValue) -> Vote {
        Vote {
            block_hash: round.proposal_hash(),
            voter: [voter; 20],
            value,
            reject_reason: None,
            timestamp: 120,
            slot_number: 0,
            signature: [0u8; 64],
        }
    }

    #[test]
    fn test_duplicate_vote_never_overwrites_first() {
        let mut round = round();
        let first = vote_for(&round, 1, VoteValue::Accept);
        let mut second = vote_for(&round, 1, VoteValue::Reject);
        second.timestamp = 130;

        round.record_vote(first).unwrap();
        let err = round.record_vote(second);
        assert!(matches!(err, Err(ConsensusError::DuplicateVote { .. })));

        let stored: Vec<_> = round.votes().collect();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_accept());
    }

    #[test]
    fn test_vote_for_wrong_block_rejected() {
        let mut round = round();
        let mut vote = vote_for(&round, 1, VoteValue::Accept);
        vote.block_hash = [0xEE; 32];
        assert!(matches!(
            round.record_vote(vote),
            Err(ConsensusError::NoMatchingProposal { .. })
        ));
    }

    #[test]
    fn test_vote_set_capacity() {
        let proposal = BlockProposal {
            block_number: 1,
            parent_hash: [1u8; 32],
            proposer: [2u8; 20],
            ..Default::default()
        };
        let mut round = VotingRound::new(proposal, 100, 2);
        round.record_vote(vote_for(&round, 1, VoteValue::Accept)).unwrap();
        round.record_vote(vote_for(&round, 2, VoteValue::Accept)).unwrap();
        assert!(matches!(
            round.record_vote(vote_for(&round, 3, VoteValue::Accept)),
            Err(ConsensusError::VoteSetFull { .. })
        ));
    }

    #[test]
    fn test_elapsed_uses_caller_clock() {
        let round = round();
        assert_eq!(round.elapsed_secs(100), 0);
        assert_eq!(round.elapsed_secs(160), 60);
        // Clock regressions saturate rather than underflow.
        assert_eq!(round.elapsed_secs(40), 0);
    }

    #[test]
    fn test_accepting_votes_sorted_by_voter() {
        let mut round = round();
        round.record_vote(vote_for(&round, 9, VoteValue::Accept)).unwrap();
        round.record_vote(vote_for(&round, 1, VoteValue::Accept)).unwrap();
        round.record_vote(vote_for(&round, 5, VoteValue::Reject)).unwrap();
        let accepts = round.accepting_votes();
        assert_eq!(accepts.len(), 2);
        assert!(accepts[0].voter < accepts[1].voter);
    }
}
