//! Domain logic for weighted sequencer consensus.
//!
//! Pure types and tallying rules; no I/O, no clocks, no locks. The
//! service layer owns the state machine transitions and drives these
//! types through the ports.

pub mod finalized;
pub mod proposal;
pub mod round;
pub mod tally;
pub mod vote;

pub use finalized::{FinalizedBlock, FinalizedHistory};
pub use proposal::BlockProposal;
pub use round::{ConsensusState, VotingRound};
pub use tally::{
    consensus_unreachable, tally_votes, ConsensusThreshold, SequencerWeights,
    WeightedConsensusResult,
};
pub use vote::{Vote, VoteValue};

use serde::{Deserialize, Serialize};
use shared_types::{ChainId, DEFAULT_L2_CHAIN_ID};

/// Tunable parameters for the consensus service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// L2 chain this committee serves.
    pub chain_id: ChainId,
    /// Weighted acceptance threshold.
    pub threshold: ConsensusThreshold,
    /// Forward clock drift tolerated on proposal timestamps (seconds).
    pub max_proposal_drift_secs: u64,
    /// Tighter forward drift applied when deciding our own vote (seconds).
    pub vote_decision_drift_secs: u64,
    /// Forward clock drift tolerated on incoming vote timestamps (seconds).
    pub max_vote_drift_secs: u64,
    /// Round timeout before the block is considered failed (milliseconds).
    pub vote_timeout_ms: u64,
    /// Bound on the local finalized-block history.
    pub max_finalized_blocks: usize,
    /// Bound on stored votes per round.
    pub max_votes_per_block: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_L2_CHAIN_ID,
            threshold: ConsensusThreshold::default(),
            max_proposal_drift_secs: 60,
            vote_decision_drift_secs: 30,
            max_vote_drift_secs: 60,
            vote_timeout_ms: 5_000,
            max_finalized_blocks: 100,
            max_votes_per_block: 1_000,
        }
    }
}
