//! # Integration Test Flows
//!
//! Tests that sequencer-consensus and reorg-recovery work together: a
//! block finalized by the committee becomes an anchor point in the
//! recovery component, and a failed round produces no anchor.
//!
//! ## Flow Tested:
//!
//! 1. **Consensus → Recovery**: finalized blocks are anchored at the
//!    current L1 tip via a consensus observer
//! 2. **Failure isolation**: failed rounds trigger leader failover and
//!    never anchor anything

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reorg_recovery::{
        AnchorPoint, InMemoryStateExecutor, L1BlockInfo, ReorgConfig, ReorgRecoveryApi,
        ReorgRecoveryService, StateExecutor,
    };
    use sequencer_consensus::{
        BlockFinalizedEvent, BlockProposal, BlockSigner, ConsensusApi, ConsensusConfig,
        ConsensusFailedEvent, ConsensusObserver, ConsensusService, ConsensusState, Ed25519Signer,
        Ed25519Verifier, InMemorySequencerRegistry, StaticLeaderSelector, SystemTimeSource,
        TimeSource, Vote, VoteValue,
    };
    use shared_types::{Hash, SequencerInfo};

    type TestConsensus = ConsensusService<
        InMemorySequencerRegistry,
        StaticLeaderSelector,
        Ed25519Verifier,
        Ed25519Signer,
    >;
    type TestRecovery = ReorgRecoveryService<InMemoryStateExecutor>;

    fn now() -> u64 {
        SystemTimeSource.now()
    }

    /// Four equally weighted committee members; this node is member 0.
    fn committee() -> Vec<Ed25519Signer> {
        (1u8..=4).map(|seed| Ed25519Signer::new([seed; 32])).collect()
    }

    fn consensus_service(keys: &[Ed25519Signer]) -> TestConsensus {
        let registry = Arc::new(InMemorySequencerRegistry::new());
        for key in keys {
            registry.register(SequencerInfo {
                address: key.address(),
                weight: 25,
                pubkey: key.public_key(),
            });
        }
        let leader = Arc::new(StaticLeaderSelector::new(
            keys.iter().map(|k| k.address()).collect(),
        ));
        ConsensusService::new(
            ConsensusConfig::default(),
            registry,
            leader,
            Ed25519Verifier,
            Ed25519Signer::new([1u8; 32]),
            Arc::new(SystemTimeSource),
        )
    }

    fn recovery_service() -> (Arc<TestRecovery>, Arc<InMemoryStateExecutor>) {
        let executor = Arc::new(InMemoryStateExecutor::new());
        let service = Arc::new(ReorgRecoveryService::new(
            ReorgConfig::default(),
            Arc::clone(&executor),
        ));
        (service, executor)
    }

    fn l1_block(number: u64) -> L1BlockInfo {
        L1BlockInfo::new(number, [number as u8; 32], [number as u8 - 1; 32], now(), 0)
    }

    fn signed_proposal(
        keys: &[Ed25519Signer],
        slot_number: u64,
        block_number: u64,
        state_root: Hash,
    ) -> BlockProposal {
        let proposer = &keys[(slot_number % keys.len() as u64) as usize];
        let mut proposal = BlockProposal {
            block_number,
            parent_hash: [1u8; 32],
            state_root,
            proposer: proposer.address(),
            timestamp: now(),
            slot_number,
            ..Default::default()
        };
        proposal.signature = proposer.sign(&proposal.signing_hash()).unwrap();
        proposal
    }

    fn signed_vote(key: &Ed25519Signer, block_hash: Hash, value: VoteValue) -> Vote {
        let mut vote = Vote {
            block_hash,
            voter: key.address(),
            value,
            reject_reason: (value == VoteValue::Reject).then(|| "bad block".to_string()),
            timestamp: now(),
            slot_number: 0,
            signature: [0u8; 64],
        };
        vote.signature = key.sign(&vote.signing_hash()).unwrap();
        vote
    }

    /// Glue between the two subsystems: each finalized block becomes an
    /// anchor at the current L1 tip.
    struct AnchorObserver {
        recovery: Arc<TestRecovery>,
    }

    impl ConsensusObserver for AnchorObserver {
        fn on_block_finalized(&self, event: &BlockFinalizedEvent) {
            let Some(tip) = self.recovery.current_l1_tip() else {
                return;
            };
            self.recovery.add_anchor_point(AnchorPoint {
                l1_block_number: tip.block_number,
                l1_block_hash: tip.block_hash,
                l2_block_number: event.block_number(),
                l2_state_root: event.block.proposal.state_root,
                batch_hash: event.block_hash(),
                timestamp: event.finalized_at,
                is_finalized: false,
            });
        }

        fn on_consensus_failed(&self, _event: &ConsensusFailedEvent) {}
    }

    #[test]
    fn test_finalized_block_becomes_anchor() {
        let keys = committee();
        let consensus = consensus_service(&keys);
        let (recovery, executor) = recovery_service();

        for number in 1..=10 {
            recovery.process_l1_block(l1_block(number)).unwrap();
        }
        consensus.register_observer(Arc::new(AnchorObserver {
            recovery: Arc::clone(&recovery),
        }));

        let proposal = signed_proposal(&keys, 0, 900, executor.state_root());
        let hash = proposal.content_hash();
        consensus.propose_block(proposal).unwrap();
        consensus.vote_on_proposal(hash).unwrap();
        consensus
            .process_vote(signed_vote(&keys[1], hash, VoteValue::Accept))
            .unwrap();
        let tally = consensus
            .process_vote(signed_vote(&keys[2], hash, VoteValue::Accept))
            .unwrap();
        assert!(tally.consensus_reached);

        let anchors = recovery.anchor_points();
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].l1_block_number, 10);
        assert_eq!(anchors[0].l2_block_number, 900);
        assert_eq!(anchors[0].batch_hash, hash);
        assert!(!anchors[0].is_finalized);

        // Six more confirmations on top finalize the anchor.
        for number in 11..=16 {
            recovery.process_l1_block(l1_block(number)).unwrap();
        }
        assert!(recovery.is_anchor_finalized(10));
    }

    #[test]
    fn test_failed_round_produces_no_anchor() {
        let keys = committee();
        let consensus = consensus_service(&keys);
        let (recovery, executor) = recovery_service();

        for number in 1..=10 {
            recovery.process_l1_block(l1_block(number)).unwrap();
        }
        consensus.register_observer(Arc::new(AnchorObserver {
            recovery: Arc::clone(&recovery),
        }));

        let proposal = signed_proposal(&keys, 0, 900, executor.state_root());
        let hash = proposal.content_hash();
        consensus.propose_block(proposal).unwrap();

        // Half the weight rejects: the threshold is unreachable and the
        // round fails early.
        consensus
            .process_vote(signed_vote(&keys[1], hash, VoteValue::Reject))
            .unwrap();
        consensus
            .process_vote(signed_vote(&keys[2], hash, VoteValue::Reject))
            .unwrap();

        assert!(consensus.failed_proposals().contains(&hash));
        assert!(recovery.anchor_points().is_empty());
        assert!(recovery.latest_finalized_anchor().is_none());
    }

    #[test]
    fn test_next_round_recovers_after_failure() {
        let keys = committee();
        let consensus = consensus_service(&keys);

        let failed = signed_proposal(&keys, 0, 900, [0xAA; 32]);
        let failed_hash = failed.content_hash();
        consensus.propose_block(failed).unwrap();
        consensus
            .process_vote(signed_vote(&keys[1], failed_hash, VoteValue::Reject))
            .unwrap();
        consensus
            .process_vote(signed_vote(&keys[2], failed_hash, VoteValue::Reject))
            .unwrap();
        assert_eq!(consensus.consensus_state(), ConsensusState::WaitingForProposal);

        // Failover to the next slot's leader; the replacement round
        // finalizes normally.
        let replacement = signed_proposal(&keys, 1, 900, [0xBB; 32]);
        let hash = replacement.content_hash();
        consensus.propose_block(replacement).unwrap();
        for member in [0usize, 2, 3] {
            let mut vote = signed_vote(&keys[member], hash, VoteValue::Accept);
            vote.slot_number = 1;
            vote.signature = keys[member].sign(&vote.signing_hash()).unwrap();
            consensus.process_vote(vote).unwrap();
        }
        assert!(consensus.has_consensus(hash));
        assert_eq!(
            consensus.latest_finalized().map(|b| b.block_hash()),
            Some(hash)
        );
    }
}
