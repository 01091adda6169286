//! Consensus service: drives proposal rounds through the weighted-BFT
//! state machine.
//!
//! One lock guards the round, the finalized history, and the observer
//! list. Every public operation acquires it once, does bounded in-memory
//! work, and releases it before observer callbacks run. Observers see a
//! snapshot of the list taken under the lock, so a callback can safely
//! re-enter the service or register further observers.

use crate::domain::{
    consensus_unreachable, tally_votes, BlockProposal, ConsensusConfig, ConsensusState,
    FinalizedBlock, FinalizedHistory, SequencerWeights, Vote, VoteValue, VotingRound,
    WeightedConsensusResult,
};
use crate::error::{ConsensusError, ConsensusResult};
use crate::events::{BlockFinalizedEvent, ConsensusFailedEvent};
use crate::ports::inbound::ConsensusApi;
use crate::ports::outbound::{
    BlockSigner, ConsensusObserver, LeaderSelector, SequencerRegistry, SignatureVerifier,
    TimeSource,
};
use parking_lot::RwLock;
use shared_types::{Address, Hash};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;


const NULL_PUBKEY: [u8; 32] = [0u8; 32];

/// Mutable state behind the service lock.
struct ConsensusServiceState {
    state: ConsensusState,
    round: Option<VotingRound>,
    finalized: FinalizedHistory,
    /// Failed proposal hashes with their reasons, oldest first.
    failures: Vec<(Hash, String)>,
    /// When non-empty, replaces the registry for weighting and
    /// eligibility. Survives `clear()`.
    weight_overrides: HashMap<Address, u64>,
    observers: Vec<Arc<dyn ConsensusObserver>>,
}

impl ConsensusServiceState {
    fn new(config: &ConsensusConfig) -> Self {
        Self {
            state: ConsensusState::WaitingForProposal,
            round: None,
            finalized: FinalizedHistory::new(config.max_finalized_blocks),
            failures: Vec::new(),
            weight_overrides: HashMap::new(),
            observers: Vec::new(),
        }
    }
}

/// Round outcome carried out of the locked section so callbacks run
/// without the lock held.
enum RoundOutcome {
    Finalized(BlockFinalizedEvent),
    Failed {
        event: ConsensusFailedEvent,
        slot_number: u64,
    },
}

/// The weighted-BFT consensus service.
pub struct ConsensusService<R, L, V, S> {
    config: ConsensusConfig,
    registry: Arc<R>,
    leader: Arc<L>,
    verifier: V,
    signer: S,
    time: Arc<dyn TimeSource>,
    state: RwLock<ConsensusServiceState>,
}

impl<R, L, V, S> ConsensusService<R, L, V, S>
where
    R: SequencerRegistry,
    L: LeaderSelector,
    V: SignatureVerifier,
    S: BlockSigner,
{
    pub fn new(
        config: ConsensusConfig,
        registry: Arc<R>,
        leader: Arc<L>,
        verifier: V,
        signer: S,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let state = RwLock::new(ConsensusServiceState::new(&config));
        Self {
            config,
            registry,
            leader,
            verifier,
            signer,
            time,
            state,
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Resolve the eligible weight set: the override map when any override
    /// is set, otherwise the registry. A registry failure degrades to an
    /// empty set rather than aborting the round.
    fn resolve_weights(&self, state: &ConsensusServiceState) -> SequencerWeights {
        if !state.weight_overrides.is_empty() {
            return SequencerWeights::new(state.weight_overrides.clone());
        }
        match self.registry.eligible_sequencers() {
            Ok(sequencers) => SequencerWeights::new(
                sequencers.into_iter().map(|s| (s.address, s.weight)).collect(),
            ),
            Err(reason) => {
                tracing::warn!(reason, "sequencer registry unavailable, weights degraded");
                SequencerWeights::default()
            }
        }
    }

    /// Record a validated vote and resolve the round if the tally is now
    /// decisive. Must run with the write lock held; returns the tally plus
    /// any outcome to deliver after the lock drops.
    fn record_and_resolve(
        &self,
        state: &mut ConsensusServiceState,
        vote: Vote,
        now: u64,
    ) -> ConsensusResult<(WeightedConsensusResult, Option<RoundOutcome>)> {
        if state.state != ConsensusState::CollectingVotes {
            return Err(ConsensusError::NoMatchingProposal {
                block_hash: vote.block_hash,
            });
        }
        let block_hash = vote.block_hash;
        {
            let round = state.round.as_mut().ok_or(ConsensusError::NoMatchingProposal {
                block_hash,
            })?;
            round.record_vote(vote)?;
            tracing::debug!(
                block_hash = ?block_hash,
                votes = round.vote_count(),
                "vote recorded"
            );
        }

        let weights = self.resolve_weights(state);
        let round = state
            .round
            .as_ref()
            .ok_or(ConsensusError::NoMatchingProposal { block_hash })?;
        let tally = tally_votes(block_hash, round.votes(), &weights, self.config.threshold, now);
        if tally.degraded {
            tracing::warn!(
                block_hash = ?block_hash,
                "zero total weight, tally degraded to unweighted counts"
            );
        }

        if tally.consensus_reached {
            let outcome = self.finalize_block(state, block_hash, tally.clone(), now);
            return Ok((tally, outcome));
        }

        if consensus_unreachable(block_hash, round.votes(), &weights, self.config.threshold) {
            tracing::info!(
                block_hash = ?block_hash,
                reject_fraction = tally.weighted_reject_fraction,
                "threshold mathematically unreachable, failing round early"
            );
            let outcome = self.fail_round(
                state,
                block_hash,
                "threshold unreachable: too many rejects",
                tally.clone(),
                now,
            );
            return Ok((tally, outcome));
        }

        Ok((tally, None))
    }

    /// Store the finalized block and reset for the next round. Idempotent
    /// per block hash: an already-finalized hash produces no second entry
    /// and no second notification.
    fn finalize_block(
        &self,
        state: &mut ConsensusServiceState,
        block_hash: Hash,
        result: WeightedConsensusResult,
        now: u64,
    ) -> Option<RoundOutcome> {
        if state.finalized.by_hash(&block_hash).is_some() {
            state.round = None;
            state.state = ConsensusState::WaitingForProposal;
            return None;
        }
        let round = match state.round.take() {
            Some(round) if round.proposal_hash() == block_hash => round,
            other => {
                state.round = other;
                return None;
            }
        };

        let block = FinalizedBlock {
            proposal: round.proposal().clone(),
            accepting_votes: round.accepting_votes(),
            result,
            finalized_at: now,
        };
        tracing::info!(
            block_hash = ?block_hash,
            block_number = block.block_number(),
            accept_fraction = block.result.weighted_accept_fraction,
            "block finalized"
        );
        state.finalized.push(block.clone());
        state.state = ConsensusState::ConsensusReached;

        Some(RoundOutcome::Finalized(BlockFinalizedEvent {
            block,
            finalized_at: now,
        }))
    }

    /// Record a round failure and prepare the failover signal.
    fn fail_round(
        &self,
        state: &mut ConsensusServiceState,
        block_hash: Hash,
        reason: &str,
        result: WeightedConsensusResult,
        now: u64,
    ) -> Option<RoundOutcome> {
        let slot_number = state
            .round
            .as_ref()
            .map(|r| r.proposal().slot_number)
            .unwrap_or_default();
        tracing::warn!(block_hash = ?block_hash, reason, "consensus failed");
        state.failures.push((block_hash, reason.to_string()));
        state.round = None;
        state.state = ConsensusState::ConsensusFailed;

        Some(RoundOutcome::Failed {
            event: ConsensusFailedEvent {
                block_hash,
                reason: reason.to_string(),
                result,
                failed_at: now,
            },
            slot_number,
        })
    }

    /// Deliver an outcome with the lock released, then settle the state
    /// machine back to `WaitingForProposal`.
    fn deliver_outcome(&self, outcome: RoundOutcome) {
        let observers = self.state.read().observers.clone();
        match outcome {
            RoundOutcome::Finalized(event) => {
                for observer in &observers {
                    let hook = AssertUnwindSafe(|| observer.on_block_finalized(&event));
                    if catch_unwind(hook).is_err() {
                        tracing::error!("finalization observer panicked");
                    }
                }
                self.settle(ConsensusState::ConsensusReached);
            }
            RoundOutcome::Failed { event, slot_number } => {
                for observer in &observers {
                    let hook = AssertUnwindSafe(|| observer.on_consensus_failed(&event));
                    if catch_unwind(hook).is_err() {
                        tracing::error!("failure observer panicked");
                    }
                }
                {
                    let mut state = self.state.write();
                    if state.state == ConsensusState::ConsensusFailed {
                        state.state = ConsensusState::FailoverInProgress;
                    }
                }
                self.leader.report_slot_timeout(slot_number, event.block_hash);
                self.settle(ConsensusState::FailoverInProgress);
            }
        }
    }

    /// Return to `WaitingForProposal` unless another round already opened.
    fn settle(&self, from: ConsensusState) {
        let mut state = self.state.write();
        if state.state == from {
            state.state = ConsensusState::WaitingForProposal;
        }
    }

    /// Verify the proposer's signature against its registry pubkey.
    ///
    /// Skipped when the registry cannot resolve the proposer or carries a
    /// null pubkey, matching the eligibility policy for votes.
    fn verify_proposer_signature(&self, proposal: &BlockProposal) -> ConsensusResult<()> {
        let info = match self.registry.sequencer_info(&proposal.proposer) {
            Ok(info) => info,
            Err(reason) => {
                tracing::warn!(reason, "registry lookup failed, skipping proposer signature");
                return Ok(());
            }
        };
        if let Some(info) = info {
            if info.pubkey != NULL_PUBKEY {
                let digest = proposal.signing_hash();
                if !proposal.is_signed()
                    || !self.verifier.verify(&digest, &proposal.signature, &info.pubkey)
                {
                    return Err(ConsensusError::InvalidProposerSignature {
                        proposer: proposal.proposer,
                    });
                }
            }
        }
        Ok(())
    }

    /// Eligibility and signature policy for an incoming vote.
    ///
    /// When overrides are active they define the eligible set and
    /// signatures are not checked (override voters have no pubkeys).
    /// Otherwise the registry decides, and a known pubkey must verify.
    fn validate_vote(&self, state: &ConsensusServiceState, vote: &Vote) -> ConsensusResult<()> {
        if !state.weight_overrides.is_empty() {
            if !state.weight_overrides.contains_key(&vote.voter) {
                return Err(ConsensusError::IneligibleVoter { voter: vote.voter });
            }
            return Ok(());
        }

        let info = match self.registry.sequencer_info(&vote.voter) {
            Ok(info) => info,
            Err(reason) => {
                tracing::warn!(reason, "registry lookup failed, accepting vote unverified");
                return Ok(());
            }
        };
        let Some(info) = info else {
            return Err(ConsensusError::IneligibleVoter { voter: vote.voter });
        };
        if info.pubkey != NULL_PUBKEY {
            let digest = vote.signing_hash();
            if !self.verifier.verify(&digest, &vote.signature, &info.pubkey) {
                return Err(ConsensusError::InvalidVoteSignature { voter: vote.voter });
            }
        }
        Ok(())
    }

    /// Decide this node's vote on the in-flight proposal.
    ///
    /// Any failed check yields a Reject with the first failing reason; a
    /// wrong-leader proposal is always a Reject, never an Abstain.
    fn decide_vote(&self, proposal: &BlockProposal, now: u64) -> (VoteValue, Option<String>) {
        if proposal.chain_id != self.config.chain_id {
            return (
                VoteValue::Reject,
                Some(format!(
                    "chain id mismatch: expected {}, got {}",
                    self.config.chain_id, proposal.chain_id
                )),
            );
        }

        match self.leader.leader_for_slot(proposal.slot_number) {
            Ok(expected) if expected != proposal.proposer => {
                return (
                    VoteValue::Reject,
                    Some("proposer is not the expected leader".to_string()),
                );
            }
            Ok(_) => {}
            Err(reason) => {
                tracing::warn!(reason, "leader selector unavailable, skipping leader check");
            }
        }

        if proposal.timestamp > now + self.config.vote_decision_drift_secs {
            return (
                VoteValue::Reject,
                Some("timestamp too far in future".to_string()),
            );
        }

        (VoteValue::Accept, None)
    }
}

impl<R, L, V, S> ConsensusApi for ConsensusService<R, L, V, S>
where
    R: SequencerRegistry,
    L: LeaderSelector,
    V: SignatureVerifier,
    S: BlockSigner,
{
    fn propose_block(&self, proposal: BlockProposal) -> ConsensusResult<()> {
        let now = self.time.now();

        if proposal.chain_id != self.config.chain_id {
            return Err(ConsensusError::ChainIdMismatch {
                expected: self.config.chain_id,
                actual: proposal.chain_id,
            });
        }
        proposal.validate_structure(now, &self.config)?;
        self.verify_proposer_signature(&proposal)?;

        let block_hash = proposal.content_hash();
        let mut state = self.state.write();
        if state.state == ConsensusState::CollectingVotes {
            if let Some(round) = &state.round {
                if round.proposal_hash() == block_hash {
                    // Same proposal delivered again, keep the votes we have.
                    return Ok(());
                }
                return Err(ConsensusError::RoundInProgress {
                    current: round.proposal_hash(),
                });
            }
        }

        tracing::info!(
            block_hash = ?block_hash,
            block_number = proposal.block_number,
            proposer = ?proposal.proposer,
            slot_number = proposal.slot_number,
            "proposal accepted, collecting votes"
        );
        state.round = Some(VotingRound::new(
            proposal,
            now,
            self.config.max_votes_per_block,
        ));
        state.state = ConsensusState::CollectingVotes;
        Ok(())
    }

    fn vote_on_proposal(&self, block_hash: Hash) -> ConsensusResult<Vote> {
        let now = self.time.now();

        let (outcome, vote) = {
            let mut state = self.state.write();
            let proposal = match &state.round {
                Some(round)
                    if state.state == ConsensusState::CollectingVotes
                        && round.proposal_hash() == block_hash =>
                {
                    round.proposal().clone()
                }
                _ => return Err(ConsensusError::NoMatchingProposal { block_hash }),
            };

            let (value, reject_reason) = self.decide_vote(&proposal, now);
            let mut vote = Vote {
                block_hash,
                voter: self.signer.address(),
                value,
                reject_reason,
                timestamp: now,
                slot_number: proposal.slot_number,
                signature: [0u8; 64],
            };
            let digest = vote.signing_hash();
            vote.signature = self
                .signer
                .sign(&digest)
                .map_err(|reason| ConsensusError::SigningFailed { reason })?;
            tracing::info!(
                block_hash = ?block_hash,
                value = %vote.value,
                reason = vote.reject_reason.as_deref().unwrap_or(""),
                "casting own vote"
            );

            let (_, outcome) = self.record_and_resolve(&mut state, vote.clone(), now)?;
            (outcome, vote)
        };

        if let Some(outcome) = outcome {
            self.deliver_outcome(outcome);
        }
        Ok(vote)
    }

    fn process_vote(&self, vote: Vote) -> ConsensusResult<WeightedConsensusResult> {
        let now = self.time.now();
        if vote.timestamp > now + self.config.max_vote_drift_secs {
            return Err(ConsensusError::TimestampTooFarInFuture {
                timestamp: vote.timestamp,
                now,
                max_drift: self.config.max_vote_drift_secs,
            });
        }

        let (tally, outcome) = {
            let mut state = self.state.write();
            self.validate_vote(&state, &vote)?;
            self.record_and_resolve(&mut state, vote, now)?
        };

        if let Some(outcome) = outcome {
            self.deliver_outcome(outcome);
        }
        Ok(tally)
    }

    fn has_consensus(&self, block_hash: Hash) -> bool {
        let state = self.state.read();
        if state.finalized.by_hash(&block_hash).is_some() {
            return true;
        }
        let Some(round) = &state.round else {
            return false;
        };
        if round.proposal_hash() != block_hash {
            return false;
        }
        let weights = self.resolve_weights(&state);
        tally_votes(
            block_hash,
            round.votes(),
            &weights,
            self.config.threshold,
            self.time.now(),
        )
        .consensus_reached
    }

    fn check_round_timeout(&self) -> ConsensusResult<bool> {
        let now = self.time.now();
        let outcome = {
            let mut state = self.state.write();
            let Some(round) = &state.round else {
                return Ok(false);
            };
            if state.state != ConsensusState::CollectingVotes {
                return Ok(false);
            }
            if round.elapsed_secs(now).saturating_mul(1_000) < self.config.vote_timeout_ms {
                return Ok(false);
            }

            let block_hash = round.proposal_hash();
            let weights = self.resolve_weights(&state);
            let tally = tally_votes(block_hash, round.votes(), &weights, self.config.threshold, now);
            self.fail_round(&mut state, block_hash, "vote timeout", tally, now)
        };

        match outcome {
            Some(outcome) => {
                self.deliver_outcome(outcome);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn consensus_state(&self) -> ConsensusState {
        self.state.read().state
    }

    fn current_proposal(&self) -> Option<BlockProposal> {
        self.state.read().round.as_ref().map(|r| r.proposal().clone())
    }

    fn votes_for(&self, block_hash: Hash) -> Vec<Vote> {
        let state = self.state.read();
        match &state.round {
            Some(round) if round.proposal_hash() == block_hash => {
                round.votes().cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    fn current_tally(&self) -> Option<WeightedConsensusResult> {
        let state = self.state.read();
        let round = state.round.as_ref()?;
        let weights = self.resolve_weights(&state);
        Some(tally_votes(
            round.proposal_hash(),
            round.votes(),
            &weights,
            self.config.threshold,
            self.time.now(),
        ))
    }

    fn round_elapsed_secs(&self) -> Option<u64> {
        let now = self.time.now();
        self.state
            .read()
            .round
            .as_ref()
            .map(|round| round.elapsed_secs(now))
    }

    fn latest_finalized(&self) -> Option<FinalizedBlock> {
        self.state.read().finalized.latest().cloned()
    }

    fn finalized_by_hash(&self, block_hash: Hash) -> Option<FinalizedBlock> {
        self.state.read().finalized.by_hash(&block_hash).cloned()
    }

    fn failed_proposals(&self) -> Vec<Hash> {
        self.state.read().failures.iter().map(|(hash, _)| *hash).collect()
    }

    fn register_observer(&self, observer: Arc<dyn ConsensusObserver>) {
        self.state.write().observers.push(observer);
    }

    fn set_weight_override(&self, sequencer: Address, weight: u64) {
        self.state.write().weight_overrides.insert(sequencer, weight);
    }

    fn clear_weight_overrides(&self) {
        self.state.write().weight_overrides.clear();
    }

    fn clear(&self) {
        let mut state = self.state.write();
        state.state = ConsensusState::WaitingForProposal;
        state.round = None;
        state.finalized.clear();
        state.failures.clear();
        state.observers.clear();
        // Weight overrides are kept so tests can reuse them across resets.
    }
}
