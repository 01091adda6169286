//! Driving ports (inbound API).

use crate::domain::{
    BlockProposal, ConsensusState, FinalizedBlock, Vote, WeightedConsensusResult,
};
use crate::error::ConsensusResult;
use crate::ports::outbound::ConsensusObserver;
use shared_types::{Address, Hash};
use std::sync::Arc;

/// Primary consensus API.
///
/// All operations are synchronous and safe to call from multiple threads;
/// the implementation serializes access internally and never blocks on
/// I/O. Round timeouts are driven by the caller via `check_round_timeout`.
pub trait ConsensusApi: Send + Sync {
    /// Accept a proposal from the current leader and open a voting round.
    ///
    /// Re-proposing the identical proposal while its round is still
    /// collecting votes is a no-op; a different proposal is rejected
    /// until the current round resolves.
    fn propose_block(&self, proposal: BlockProposal) -> ConsensusResult<()>;

    /// Validate the in-flight proposal and cast this node's own vote.
    ///
    /// Returns the signed vote that was recorded (and would be broadcast).
    fn vote_on_proposal(&self, block_hash: Hash) -> ConsensusResult<Vote>;

    /// Ingest a vote from another committee member.
    ///
    /// Every vote triggers a re-tally; the round resolves as soon as the
    /// threshold is met or becomes unreachable.
    fn process_vote(&self, vote: Vote) -> ConsensusResult<WeightedConsensusResult>;

    /// Whether the given block reached consensus (finalized locally).
    fn has_consensus(&self, block_hash: Hash) -> bool;

    /// Expire the round if it has outlived the vote timeout.
    ///
    /// Returns true when a timeout fired and the round transitioned to
    /// failed / failover.
    fn check_round_timeout(&self) -> ConsensusResult<bool>;

    /// Current state of the round state machine.
    fn consensus_state(&self) -> ConsensusState;

    /// The in-flight proposal, if a round is open.
    fn current_proposal(&self) -> Option<BlockProposal>;

    /// Votes recorded for the given block hash in the current round.
    fn votes_for(&self, block_hash: Hash) -> Vec<Vote>;

    /// Tally for the in-flight round without mutating anything.
    fn current_tally(&self) -> Option<WeightedConsensusResult>;

    /// Seconds the current round has been open, per the service clock.
    fn round_elapsed_secs(&self) -> Option<u64>;

    /// The most recently finalized block, if any.
    fn latest_finalized(&self) -> Option<FinalizedBlock>;

    /// Look up a finalized block by its content hash.
    fn finalized_by_hash(&self, block_hash: Hash) -> Option<FinalizedBlock>;

    /// Hashes of proposals whose rounds failed, newest last.
    fn failed_proposals(&self) -> Vec<Hash>;

    /// Register an observer for finalization and failure events.
    fn register_observer(&self, observer: Arc<dyn ConsensusObserver>);

    /// Pin a voter's weight, bypassing the registry. Once any override is
    /// set, the override map replaces the registry entirely. Test-only.
    fn set_weight_override(&self, sequencer: Address, weight: u64);

    /// Drop all weight overrides and fall back to the registry.
    fn clear_weight_overrides(&self);

    /// Reset to `WaitingForProposal`: drops the in-flight round, the vote
    /// set, the finalized history, the failure ledger, and all observers.
    /// Weight overrides survive so tests can reuse them across resets.
    fn clear(&self);
}
