//! Reorg recovery service: tracks L1 headers, detects reorganizations,
//! and restores L2 state by reverting to an anchor and replaying the
//! transaction log.
//!
//! One lock guards the L1 history, the anchor set, the transaction log,
//! and the observer list. Every public operation acquires it once, does
//! bounded in-memory work, and releases it before observer callbacks run.

use crate::domain::{
    AnchorPoint, AnchorSet, L1BlockInfo, L1History, RecoveryCircuitBreaker, RecoveryEvent,
    RecoveryState, ReorgConfig, ReorgDetection, ReorgRecovery, ReplayOutcome, TransactionLog,
    TransactionLogEntry,
};
use crate::error::{ReorgError, ReorgResult};
use crate::events::ReorgEvent;
use crate::ports::inbound::{ReorgRecoveryApi, ReorgStatistics};
use crate::ports::outbound::{ReorgObserver, StateExecutor};
use parking_lot::RwLock;
use shared_types::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Lifetime counters reported through `statistics()`.
#[derive(Debug, Default, Clone, Copy)]
struct RecoveryCounters {
    reorgs_detected: u64,
    reorgs_recovered: u64,
    transactions_replayed: u64,
    transactions_failed: u64,
}

/// Mutable state behind the service lock.
struct ReorgServiceState {
    history: L1History,
    anchors: AnchorSet,
    tx_log: TransactionLog,
    observers: Vec<Arc<dyn ReorgObserver>>,
    breaker: RecoveryCircuitBreaker,
    counters: RecoveryCounters,
}

impl ReorgServiceState {
    fn new(config: &ReorgConfig) -> Self {
        Self {
            history: L1History::new(config.max_l1_history),
            anchors: AnchorSet::new(config.max_anchor_points),
            tx_log: TransactionLog::new(config.max_tx_log_size),
            observers: Vec::new(),
            breaker: RecoveryCircuitBreaker::new(config.max_retry_attempts),
            counters: RecoveryCounters::default(),
        }
    }
}

/// The reorg detection and recovery service.
pub struct ReorgRecoveryService<X> {
    config: ReorgConfig,
    executor: Arc<X>,
    state: RwLock<ReorgServiceState>,
}

impl<X: StateExecutor> ReorgRecoveryService<X> {
    pub fn new(config: ReorgConfig, executor: Arc<X>) -> Self {
        let state = RwLock::new(ReorgServiceState::new(&config));
        Self {
            config,
            executor,
            state,
        }
    }

    pub fn config(&self) -> &ReorgConfig {
        &self.config
    }

    /// Classify a candidate tip against tracked history. Read-only.
    fn detect(
        &self,
        state: &ReorgServiceState,
        new_tip: &L1BlockInfo,
    ) -> ReorgResult<Option<ReorgDetection>> {
        let Some(old_tip) = state.history.tip() else {
            return Ok(None);
        };
        if old_tip.block_number == 0 {
            return Ok(None);
        }
        if new_tip.block_hash == old_tip.block_hash || new_tip.extends(old_tip) {
            return Ok(None);
        }

        let (fork_point, fork_point_verified) = state
            .history
            .find_fork_point(old_tip, new_tip)
            .ok_or(ReorgError::ForkPointNotFound)?;

        let reorg_depth = old_tip.block_number.saturating_sub(fork_point);
        if reorg_depth > self.config.max_reorg_depth {
            return Err(ReorgError::ReorgTooDeep {
                depth: reorg_depth,
                max: self.config.max_reorg_depth,
            });
        }

        let fork_point_hash = state
            .history
            .get(fork_point)
            .map(|block| block.block_hash)
            .unwrap_or_default();

        Ok(Some(ReorgDetection {
            reorg_depth,
            fork_point,
            fork_point_hash,
            fork_point_verified,
            old_tip: old_tip.clone(),
            new_tip: new_tip.clone(),
        }))
    }

    /// Revert to the last anchor below `fork_point` and drop everything
    /// above it. Must run with the write lock held. All-or-nothing: a
    /// refused revert deletes nothing and the breaker records a
    /// retryable failure.
    fn revert_inner(
        &self,
        state: &mut ReorgServiceState,
        fork_point: u64,
    ) -> ReorgResult<AnchorPoint> {
        let Some(anchor) = state.anchors.last_valid_before(fork_point).cloned() else {
            state.breaker.process_event(RecoveryEvent::UnrecoverableFault);
            tracing::error!(fork_point, "no anchor below fork point, halting recovery");
            return Err(ReorgError::NoAnchorBeforeFork { fork_point });
        };

        if !self.executor.revert_to_state_root(&anchor.l2_state_root) {
            state.breaker.process_event(RecoveryEvent::RevertFailed);
            tracing::error!(
                state_root = ?anchor.l2_state_root,
                "state executor refused revert, recovery can be retried"
            );
            return Err(ReorgError::StateRevertFailed {
                state_root: anchor.l2_state_root,
            });
        }
        self.executor.set_block_number(anchor.l2_block_number);

        state.anchors.remove_after(fork_point);
        state.history.remove_after(fork_point);

        tracing::info!(
            l1_block = anchor.l1_block_number,
            l2_block = anchor.l2_block_number,
            state_root = ?anchor.l2_state_root,
            "reverted to anchor"
        );
        Ok(anchor)
    }

    /// Replay logged transactions in `[from_block, to_block]` against the
    /// executor, advancing its block counter across block boundaries.
    /// Best-effort: per-entry failures are counted, never fatal.
    fn replay_inner(
        &self,
        state: &mut ReorgServiceState,
        from_block: u64,
        to_block: u64,
    ) -> ReplayOutcome {
        let entries = state.tx_log.range(from_block, to_block);
        let mut outcome = ReplayOutcome::default();
        let mut current_block = from_block;

        for entry in entries {
            if entry.l2_block_number > current_block {
                current_block = entry.l2_block_number;
                self.executor.set_block_number(current_block);
            }

            let tx = match entry.decode_transaction() {
                Ok(tx) => tx,
                Err(err) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        tx_hash = ?entry.tx_hash,
                        error = %err,
                        "skipping corrupt log entry during replay"
                    );
                    continue;
                }
            };

            let result = self.executor.apply_transaction(&tx, current_block);
            state
                .tx_log
                .record_outcome(&entry.tx_hash, result.success, result.gas_used);
            if result.success {
                outcome.replayed += 1;
            } else {
                outcome.failed += 1;
                tracing::warn!(
                    tx_hash = ?entry.tx_hash,
                    error = result.error.as_deref().unwrap_or(""),
                    "transaction failed during replay"
                );
            }
        }

        outcome
    }

    fn notify_observers(&self, observers: &[Arc<dyn ReorgObserver>], event: &ReorgEvent) {
        for observer in observers {
            let hook = AssertUnwindSafe(|| observer.on_reorg(event));
            if catch_unwind(hook).is_err() {
                tracing::error!("reorg observer panicked");
            }
        }
    }
}

impl<X: StateExecutor> ReorgRecoveryApi for ReorgRecoveryService<X> {
    fn process_l1_block(&self, block: L1BlockInfo) -> ReorgResult<Option<ReorgDetection>> {
        let mut state = self.state.write();
        if state.breaker.is_halted() {
            return Err(ReorgError::Halted {
                reason: "recovery circuit breaker is open".to_string(),
            });
        }

        let tip_snapshot = state.history.tip().cloned();
        let detection = match &tip_snapshot {
            Some(tip) if tip.block_number > 0 => {
                if block.extends(tip) {
                    None
                } else {
                    match self.detect(&state, &block) {
                        Ok(detection) => detection,
                        Err(err) => {
                            // Unrecoverable: leave all tracked state as it
                            // was and halt further ingestion.
                            state.breaker.process_event(RecoveryEvent::UnrecoverableFault);
                            tracing::error!(
                                block_number = block.block_number,
                                error = %err,
                                "reorg detection failed, halting"
                            );
                            return Err(err);
                        }
                    }
                }
            }
            _ => None,
        };

        if let Some(detection) = &detection {
            state.counters.reorgs_detected += 1;
            tracing::warn!(
                depth = detection.reorg_depth,
                fork_point = detection.fork_point,
                old_tip = detection.old_tip.block_number,
                new_tip = detection.new_tip.block_number,
                "L1 reorg detected"
            );
        }

        state.history.insert(block.clone());

        let advance_tip = match state.history.tip() {
            None => true,
            Some(tip) => {
                block.block_number > tip.block_number
                    || detection
                        .as_ref()
                        .is_some_and(|d| block.block_number >= d.fork_point)
            }
        };
        if advance_tip {
            state.history.set_tip(block);
        }

        if let Some(tip_number) = state.history.tip().map(|tip| tip.block_number) {
            state
                .anchors
                .finalize_up_to(tip_number, self.config.finality_depth);
        }

        Ok(detection)
    }

    fn check_for_reorg(&self, new_tip: &L1BlockInfo) -> ReorgResult<Option<ReorgDetection>> {
        let state = self.state.read();
        self.detect(&state, new_tip)
    }

    fn revert_to_last_valid_anchor(&self, fork_point: u64) -> ReorgResult<AnchorPoint> {
        let mut state = self.state.write();
        self.revert_inner(&mut state, fork_point)
    }

    fn replay_transactions(&self, from_block: u64, to_block: u64) -> ReplayOutcome {
        let mut state = self.state.write();
        self.replay_inner(&mut state, from_block, to_block)
    }

    fn handle_reorg(&self, detection: &ReorgDetection) -> ReorgResult<ReorgRecovery> {
        let (observers, event, recovery) = {
            let mut state = self.state.write();
            if state.breaker.is_halted() {
                return Err(ReorgError::Halted {
                    reason: "recovery circuit breaker is open".to_string(),
                });
            }

            if detection.reorg_depth == 0 {
                return Err(ReorgError::NoReorgDetected);
            }

            tracing::info!(
                depth = detection.reorg_depth,
                fork_point = detection.fork_point,
                "handling reorg"
            );

            // Affected set is computed before reverting, while the anchor
            // and the log entries above it still exist.
            let Some(anchor) = state.anchors.last_valid_before(detection.fork_point).cloned()
            else {
                state.breaker.process_event(RecoveryEvent::UnrecoverableFault);
                return Err(ReorgError::NoAnchorBeforeFork {
                    fork_point: detection.fork_point,
                });
            };
            let affected = state.tx_log.hashes_from_block(anchor.l2_block_number);

            self.revert_inner(&mut state, detection.fork_point)?;

            let replay = self.replay_inner(&mut state, anchor.l2_block_number + 1, u64::MAX);

            state.history.insert(detection.new_tip.clone());
            state.history.set_tip(detection.new_tip.clone());

            let recovery = ReorgRecovery {
                new_state_root: self.executor.state_root(),
                new_l2_block_number: self.executor.block_number(),
                transactions_replayed: replay.replayed,
                transactions_failed: replay.failed,
                affected_transactions: affected,
            };
            state.breaker.process_event(RecoveryEvent::RecoverySucceeded);
            state.counters.reorgs_recovered += 1;
            state.counters.transactions_replayed += replay.replayed as u64;
            state.counters.transactions_failed += replay.failed as u64;

            tracing::info!(
                replayed = replay.replayed,
                failed = replay.failed,
                affected = recovery.affected_transactions.len(),
                new_l2_block = recovery.new_l2_block_number,
                "recovery complete"
            );

            let event = ReorgEvent {
                detection: detection.clone(),
                recovery: recovery.clone(),
            };
            (state.observers.clone(), event, recovery)
        };

        self.notify_observers(&observers, &event);
        Ok(recovery)
    }

    fn add_anchor_point(&self, anchor: AnchorPoint) {
        let mut state = self.state.write();
        let mut anchor = anchor;
        if let Some(tip) = state.history.tip() {
            if tip.block_number >= anchor.l1_block_number + u64::from(self.config.finality_depth) {
                anchor.is_finalized = true;
            }
        }

        self.executor
            .create_snapshot(anchor.l2_block_number, anchor.l1_block_number);

        tracing::debug!(
            l1_block = anchor.l1_block_number,
            l2_block = anchor.l2_block_number,
            finalized = anchor.is_finalized,
            "anchor added"
        );
        state.anchors.insert(anchor);
    }

    fn update_anchor_finalization(&self, l1_block_number: u64, confirmations: u32) {
        self.state
            .write()
            .anchors
            .finalize_at(l1_block_number, confirmations, self.config.finality_depth);
    }

    fn is_anchor_finalized(&self, l1_block_number: u64) -> bool {
        self.state
            .read()
            .anchors
            .get(l1_block_number)
            .map(|anchor| anchor.is_finalized)
            .unwrap_or(false)
    }

    fn last_valid_anchor(&self, before_l1_block: u64) -> Option<AnchorPoint> {
        self.state
            .read()
            .anchors
            .last_valid_before(before_l1_block)
            .cloned()
    }

    fn latest_finalized_anchor(&self) -> Option<AnchorPoint> {
        self.state.read().anchors.latest_finalized().cloned()
    }

    fn anchor_points(&self) -> Vec<AnchorPoint> {
        self.state.read().anchors.iter().cloned().collect()
    }

    fn log_transaction(&self, entry: TransactionLogEntry) {
        self.state.write().tx_log.insert(entry);
    }

    fn transaction_log(&self, tx_hash: &Hash) -> Option<TransactionLogEntry> {
        self.state.read().tx_log.get(tx_hash).cloned()
    }

    fn transactions_in_range(&self, from_block: u64, to_block: u64) -> Vec<TransactionLogEntry> {
        self.state.read().tx_log.range(from_block, to_block)
    }

    fn prune_transaction_logs(&self, before_block: u64) -> usize {
        self.state.write().tx_log.prune_before(before_block)
    }

    fn current_l1_tip(&self) -> Option<L1BlockInfo> {
        self.state.read().history.tip().cloned()
    }

    fn l1_block(&self, block_number: u64) -> Option<L1BlockInfo> {
        self.state.read().history.get(block_number).cloned()
    }

    fn register_observer(&self, observer: Arc<dyn ReorgObserver>) {
        self.state.write().observers.push(observer);
    }

    fn statistics(&self) -> ReorgStatistics {
        let state = self.state.read();
        ReorgStatistics {
            chain_id: self.config.chain_id,
            finality_depth: self.config.finality_depth,
            current_l1_tip: state.history.tip().map(|t| t.block_number).unwrap_or(0),
            l1_blocks_tracked: state.history.len(),
            anchor_points: state.anchors.len(),
            finalized_anchors: state.anchors.finalized_count(),
            transaction_logs: state.tx_log.len(),
            observers: state.observers.len(),
            recovery_state: state.breaker.state(),
            consecutive_failures: state.breaker.consecutive_failures(),
            reorgs_detected: state.counters.reorgs_detected,
            reorgs_recovered: state.counters.reorgs_recovered,
            transactions_replayed: state.counters.transactions_replayed,
            transactions_failed: state.counters.transactions_failed,
        }
    }

    fn is_healthy(&self) -> bool {
        let state = self.state.read();
        if state.breaker.is_halted() {
            return false;
        }
        if state.history.is_empty() {
            // Just started, no data yet.
            return true;
        }
        let tip_number = state.history.tip().map(|t| t.block_number).unwrap_or(0);
        if tip_number > self.config.min_anchor_interval && state.anchors.is_empty() {
            return false;
        }
        true
    }

    fn recovery_state(&self) -> RecoveryState {
        self.state.read().breaker.state()
    }

    fn manual_reset(&self) {
        let mut state = self.state.write();
        state.breaker.process_event(RecoveryEvent::ManualReset);
        tracing::info!("recovery circuit breaker manually reset");
    }

    fn clear(&self) {
        let mut state = self.state.write();
        state.history.clear();
        state.anchors.clear();
        state.tx_log.clear();
        state.observers.clear();
        state.breaker = RecoveryCircuitBreaker::new(self.config.max_retry_attempts);
        state.counters = RecoveryCounters::default();
    }
}
