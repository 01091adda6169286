//! Circuit breaker guarding the recovery path.
//!
//! ```text
//! [RUNNING] ──revert failed──→ [RETRYING {attempt: 1}]
//!     ↑                              │
//!     │          recovery succeeded ─┘──→ [RUNNING]
//!     │                              │
//!     │              revert failed ──→ [RETRYING {attempt: n+1}]
//!     │                                       │
//!     │                          attempt >= max? ──→ [HALTED]
//!     │                                                  │
//!     └─────────────── manual reset ────────────────────┘
//! ```
//!
//! Unrecoverable faults (reorg too deep, no fork point, no anchor) jump
//! straight to halted: retrying cannot fix them.

use serde::{Deserialize, Serialize};

/// Recovery health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecoveryState {
    /// Normal operation.
    #[default]
    Running,
    /// A retryable revert failure occurred; recovery may be re-attempted.
    Retrying { attempt: u8 },
    /// Halted after repeated failures or an unrecoverable fault.
    HaltedAwaitingIntervention,
}

/// Events driving recovery state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryEvent {
    /// A recovery run completed successfully.
    RecoverySucceeded,
    /// The state executor refused the revert; nothing was deleted.
    RevertFailed,
    /// Depth bound exceeded, no fork point, or no anchor: not retryable.
    UnrecoverableFault,
    /// Operator cleared the halt.
    ManualReset,
}

/// Deterministic circuit breaker over recovery attempts.
#[derive(Debug)]
pub struct RecoveryCircuitBreaker {
    state: RecoveryState,
    max_attempts: u8,
    consecutive_failures: u64,
    intervention_count: u64,
}

impl RecoveryCircuitBreaker {
    pub fn new(max_attempts: u8) -> Self {
        Self {
            state: RecoveryState::Running,
            max_attempts,
            consecutive_failures: 0,
            intervention_count: 0,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RecoveryState::Running)
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, RecoveryState::HaltedAwaitingIntervention)
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures
    }

    pub fn intervention_count(&self) -> u64 {
        self.intervention_count
    }

    /// Process an event and transition state.
    pub fn process_event(&mut self, event: RecoveryEvent) -> RecoveryState {
        let next = self.next_state(event);
        match event {
            RecoveryEvent::RevertFailed | RecoveryEvent::UnrecoverableFault => {
                self.consecutive_failures += 1;
            }
            RecoveryEvent::RecoverySucceeded => {
                self.consecutive_failures = 0;
            }
            RecoveryEvent::ManualReset => {
                self.intervention_count += 1;
                self.consecutive_failures = 0;
            }
        }
        self.state = next;
        next
    }

    fn next_state(&self, event: RecoveryEvent) -> RecoveryState {
        match (self.state, event) {
            (RecoveryState::Running, RecoveryEvent::RevertFailed) => {
                RecoveryState::Retrying { attempt: 1 }
            }
            (RecoveryState::Retrying { .. }, RecoveryEvent::RecoverySucceeded) => {
                RecoveryState::Running
            }
            (RecoveryState::Retrying { attempt }, RecoveryEvent::RevertFailed) => {
                if attempt >= self.max_attempts {
                    RecoveryState::HaltedAwaitingIntervention
                } else {
                    RecoveryState::Retrying { attempt: attempt + 1 }
                }
            }
            (RecoveryState::Running | RecoveryState::Retrying { .. }, RecoveryEvent::UnrecoverableFault) => {
                RecoveryState::HaltedAwaitingIntervention
            }
            (RecoveryState::HaltedAwaitingIntervention, RecoveryEvent::ManualReset) => {
                RecoveryState::Running
            }
            (state, _) => state,
        }
    }
}

impl Default for RecoveryCircuitBreaker {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_failure_enters_retrying() {
        let mut breaker = RecoveryCircuitBreaker::default();
        breaker.process_event(RecoveryEvent::RevertFailed);
        assert_eq!(breaker.state(), RecoveryState::Retrying { attempt: 1 });
    }

    #[test]
    fn test_success_returns_to_running() {
        let mut breaker = RecoveryCircuitBreaker::default();
        breaker.process_event(RecoveryEvent::RevertFailed);
        breaker.process_event(RecoveryEvent::RecoverySucceeded);
        assert!(breaker.is_running());
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn test_repeated_failures_halt() {
        let mut breaker = RecoveryCircuitBreaker::default();
        breaker.process_event(RecoveryEvent::RevertFailed);
        breaker.process_event(RecoveryEvent::RevertFailed);
        breaker.process_event(RecoveryEvent::RevertFailed);
        assert_eq!(breaker.state(), RecoveryState::Retrying { attempt: 3 });
        breaker.process_event(RecoveryEvent::RevertFailed);
        assert!(breaker.is_halted());
    }

    #[test]
    fn test_unrecoverable_fault_halts_immediately() {
        let mut breaker = RecoveryCircuitBreaker::default();
        breaker.process_event(RecoveryEvent::UnrecoverableFault);
        assert!(breaker.is_halted());
    }

    #[test]
    fn test_only_manual_reset_leaves_halted() {
        let mut breaker = RecoveryCircuitBreaker::default();
        breaker.process_event(RecoveryEvent::UnrecoverableFault);
        breaker.process_event(RecoveryEvent::RecoverySucceeded);
        assert!(breaker.is_halted());
        breaker.process_event(RecoveryEvent::ManualReset);
        assert!(breaker.is_running());
        assert_eq!(breaker.intervention_count(), 1);
    }
}
