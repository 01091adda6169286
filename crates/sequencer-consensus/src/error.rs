//! Error types for the sequencer consensus subsystem.

use shared_types::{Address, ChainId, Hash};
use thiserror::Error;

/// Consensus subsystem errors.
///
/// Every rejection carries enough context to produce an audit-grade log
/// line; none of these conditions crash the component.
#[derive(Debug, Clone, Error)]
pub enum ConsensusError {
    /// Structurally invalid proposal.
    #[error("Malformed proposal: {reason}")]
    MalformedProposal { reason: String },

    /// Proposal or vote built for a different L2 chain.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: ChainId, actual: ChainId },

    /// A round is already collecting votes for another proposal.
    #[error("Round in progress for block {current:?}, cannot accept a different proposal")]
    RoundInProgress { current: Hash },

    /// Proposer signature did not verify against the registry pubkey.
    #[error("Invalid proposer signature from {proposer:?}")]
    InvalidProposerSignature { proposer: Address },

    /// Voter is not in the eligible sequencer set.
    #[error("Voter {voter:?} is not an eligible sequencer")]
    IneligibleVoter { voter: Address },

    /// Vote signature did not verify.
    #[error("Invalid vote signature from {voter:?}")]
    InvalidVoteSignature { voter: Address },

    /// Timestamp beyond the forward drift bound.
    #[error("Timestamp {timestamp} too far in the future (now {now}, max drift {max_drift}s)")]
    TimestampTooFarInFuture {
        timestamp: u64,
        now: u64,
        max_drift: u64,
    },

    /// Vote references a block hash with no matching in-flight proposal.
    #[error("Vote for block {block_hash:?} does not match any in-flight proposal")]
    NoMatchingProposal { block_hash: Hash },

    /// A vote from this voter was already recorded for this block.
    #[error("Duplicate vote from {voter:?} for block {block_hash:?}")]
    DuplicateVote { voter: Address, block_hash: Hash },

    /// Per-round vote storage is full.
    #[error("Vote set full: {limit} votes already recorded")]
    VoteSetFull { limit: usize },

    /// Local signing of a vote failed.
    #[error("Failed to sign vote: {reason}")]
    SigningFailed { reason: String },
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
