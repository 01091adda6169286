//! # End-to-End Reorg Recovery
//!
//! Full pipeline choreography: the committee finalizes an L2 block, the
//! recovery component anchors it against the L1 tip, subsequent L2
//! transactions are logged, then an L1 reorg below the anchored height
//! forces a revert and a deterministic replay.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use reorg_recovery::{
        AnchorPoint, InMemoryStateExecutor, L1BlockInfo, RecoveryState, ReorgConfig, ReorgError,
        ReorgEvent, ReorgObserver, ReorgRecoveryApi, ReorgRecoveryService, StateExecutor,
        TransactionLogEntry,
    };
    use sequencer_consensus::{
        BlockProposal, BlockSigner, ConsensusApi, ConsensusConfig, ConsensusService,
        Ed25519Signer, Ed25519Verifier, InMemorySequencerRegistry, StaticLeaderSelector,
        SystemTimeSource, TimeSource, Vote, VoteValue,
    };
    use shared_types::{Hash, RawTransaction, SequencerInfo};

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

    /// A linked L1 chain where block N has hash [N; 32].
    fn l1_block(number: u64) -> L1BlockInfo {
        L1BlockInfo::new(number, [number as u8; 32], [number as u8 - 1; 32], now(), 0)
    }

    fn ingest_chain(recovery: &TestRecovery, from: u64, to: u64) {
        for number in from..=to {
            recovery.process_l1_block(l1_block(number)).unwrap();
        }
    }

    fn tx(seed: u8) -> RawTransaction {
        RawTransaction {
            from: [seed; 20],
            to: [2u8; 20],
            nonce: u64::from(seed),
            value: 1_000,
            payload: vec![seed; 8],
        }
    }

    /// Apply and log one transaction per L2 block after the anchored
    /// block, the way the sequencer does between anchors.
    fn apply_and_log_txs(
        recovery: &TestRecovery,
        executor: &InMemoryStateExecutor,
        anchored_l2_block: u64,
        anchor_l1_block: u64,
        count: u8,
    ) {
        for seed in 1..=count {
            let transaction = tx(seed);
            let l2_block = anchored_l2_block + u64::from(seed);
            let outcome = executor.apply_transaction(&transaction, l2_block);
            assert!(outcome.success);
            let mut entry = TransactionLogEntry::for_transaction(
                &transaction,
                l2_block,
                anchor_l1_block,
                now(),
            );
            entry.was_successful = outcome.success;
            entry.gas_used = outcome.gas_used;
            recovery.log_transaction(entry);
        }
    }

    fn finalize_block(
        consensus: &TestConsensus,
        keys: &[Ed25519Signer],
        block_number: u64,
        state_root: Hash,
    ) -> Hash {
        let proposer = &keys[0];
        let mut proposal = BlockProposal {
            block_number,
            parent_hash: [1u8; 32],
            state_root,
            proposer: proposer.address(),
            timestamp: now(),
            slot_number: 0,
            ..Default::default()
        };
        proposal.signature = proposer.sign(&proposal.signing_hash()).unwrap();
        let hash = proposal.content_hash();

        consensus.propose_block(proposal).unwrap();
        for key in &keys[1..=2] {
            let mut vote = Vote {
                block_hash: hash,
                voter: key.address(),
                value: VoteValue::Accept,
                reject_reason: None,
                timestamp: now(),
                slot_number: 0,
                signature: [0u8; 64],
            };
            vote.signature = key.sign(&vote.signing_hash()).unwrap();
            consensus.process_vote(vote).unwrap();
        }
        consensus.vote_on_proposal(hash).unwrap();
        assert!(consensus.has_consensus(hash));
        hash
    }

    #[derive(Default)]
    struct RecordingReorgObserver {
        events: Mutex<Vec<ReorgEvent>>,
    }

    impl ReorgObserver for RecordingReorgObserver {
        fn on_reorg(&self, event: &ReorgEvent) {
            self.events.lock().push(event.clone());
        }
    }

    #[test]
    fn test_finalize_anchor_reorg_recover_pipeline() {
        let keys = committee();
        let consensus = consensus_service(&keys);
        let (recovery, executor) = recovery_service();
        let observer = Arc::new(RecordingReorgObserver::default());
        recovery.register_observer(observer.clone());

        // L1 advances to 90; the committee finalizes L2 block 900 over
        // the executor's current root, which gets anchored at the tip.
        ingest_chain(&recovery, 80, 90);
        let anchor_root = executor.state_root();
        let batch_hash = finalize_block(&consensus, &keys, 900, anchor_root);
        recovery.add_anchor_point(AnchorPoint {
            l1_block_number: 90,
            l1_block_hash: [90u8; 32],
            l2_block_number: 900,
            l2_state_root: anchor_root,
            batch_hash,
            timestamp: now(),
            is_finalized: false,
        });

        // Five more L2 blocks of activity while L1 advances to 100.
        apply_and_log_txs(&recovery, &executor, 900, 90, 5);
        let root_before_reorg = executor.state_root();
        ingest_chain(&recovery, 91, 100);

        // A competing block at 96 built on our H95 arrives: 5-deep reorg.
        let detection = recovery
            .process_l1_block(L1BlockInfo::new(96, [0xAA; 32], [95u8; 32], now(), 0))
            .unwrap()
            .expect("reorg expected");
        assert_eq!(detection.fork_point, 95);
        assert_eq!(detection.reorg_depth, 5);
        assert!(detection.fork_point_verified);

        let result = recovery.handle_reorg(&detection).unwrap();
        assert_eq!(result.transactions_replayed, 5);
        assert_eq!(result.transactions_failed, 0);
        assert_eq!(result.new_l2_block_number, 905);
        // Deterministic replay reproduces the exact pre-reorg root.
        assert_eq!(result.new_state_root, root_before_reorg);
        assert_eq!(result.affected_transactions.len(), 5);

        // The anchor below the fork survived; everything above is gone.
        assert!(recovery.last_valid_anchor(95).is_some());
        assert!(recovery.l1_block(97).is_none());
        assert_eq!(
            recovery.current_l1_tip().map(|t| t.block_hash),
            Some([0xAA; 32])
        );

        let events = observer.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].recovery.new_state_root, root_before_reorg);

        let stats = recovery.statistics();
        assert_eq!(stats.reorgs_detected, 1);
        assert_eq!(stats.reorgs_recovered, 1);
        assert_eq!(stats.transactions_replayed, 5);
        assert_eq!(stats.transactions_failed, 0);
    }

    #[test]
    fn test_replay_is_deterministic_across_instances() {
        let run = || {
            let (recovery, executor) = recovery_service();
            ingest_chain(&recovery, 80, 90);
            let anchor_root = executor.state_root();
            recovery.add_anchor_point(AnchorPoint {
                l1_block_number: 90,
                l1_block_hash: [90u8; 32],
                l2_block_number: 900,
                l2_state_root: anchor_root,
                batch_hash: [0u8; 32],
                timestamp: 1_000,
                is_finalized: false,
            });
            apply_and_log_txs(&recovery, &executor, 900, 90, 5);
            ingest_chain(&recovery, 91, 100);

            let detection = recovery
                .process_l1_block(L1BlockInfo::new(96, [0xAA; 32], [95u8; 32], now(), 0))
                .unwrap()
                .expect("reorg expected");
            recovery.handle_reorg(&detection).unwrap()
        };

        let first = run();
        let second = run();
        assert_eq!(first.new_state_root, second.new_state_root);
        assert_eq!(first.new_l2_block_number, second.new_l2_block_number);
        assert_eq!(first.transactions_replayed, second.transactions_replayed);
    }

    #[test]
    fn test_deep_reorg_halts_pipeline_until_reset() {
        let (recovery, executor) = recovery_service();
        ingest_chain(&recovery, 1, 200);
        let anchor_root = executor.state_root();
        recovery.add_anchor_point(AnchorPoint {
            l1_block_number: 10,
            l1_block_hash: [10u8; 32],
            l2_block_number: 100,
            l2_state_root: anchor_root,
            batch_hash: [0u8; 32],
            timestamp: 1_000,
            is_finalized: false,
        });

        // A fork 150+ blocks down is beyond automatic recovery.
        let err = recovery.process_l1_block(L1BlockInfo::new(50, [0xAA; 32], [0xBB; 32], now(), 0));
        assert!(matches!(err, Err(ReorgError::ReorgTooDeep { .. })));
        assert_eq!(
            recovery.recovery_state(),
            RecoveryState::HaltedAwaitingIntervention
        );
        assert!(!recovery.is_healthy());
        assert!(matches!(
            recovery.process_l1_block(l1_block(201)),
            Err(ReorgError::Halted { .. })
        ));

        // Operator intervenes; ingestion resumes and the anchor is intact.
        recovery.manual_reset();
        assert!(recovery.process_l1_block(l1_block(201)).unwrap().is_none());
        assert!(recovery.is_healthy());
        assert!(recovery.last_valid_anchor(50).is_some());
    }
}
