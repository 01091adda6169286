//! Error types for the reorg recovery subsystem.

use shared_types::Hash;
use thiserror::Error;

/// Reorg recovery errors.
///
/// `ReorgTooDeep` and `ForkPointNotFound` are unrecoverable by this
/// component: they must be escalated to manual intervention rather than
/// resolved by guessing, since continuing to serve L2 state built on
/// invalidated L1 history is unsafe. `StateRevertFailed` is retryable:
/// nothing has been deleted when it is returned.
#[derive(Debug, Clone, Error)]
pub enum ReorgError {
    /// Fork depth exceeds the automatic recovery bound.
    #[error("Reorg depth {depth} exceeds maximum {max}, manual intervention required")]
    ReorgTooDeep { depth: u64, max: u64 },

    /// No common ancestor recoverable from tracked history.
    #[error("Could not find fork point in tracked L1 history")]
    ForkPointNotFound,

    /// Recovery needs an anchor below the fork point and none exists.
    #[error("No valid anchor found before fork point {fork_point}")]
    NoAnchorBeforeFork { fork_point: u64 },

    /// The state executor refused or failed the reversion. Retryable;
    /// no history was deleted.
    #[error("State executor failed to revert to root {state_root:?}")]
    StateRevertFailed { state_root: Hash },

    /// `handle_reorg` was called with a zero-depth detection.
    #[error("No reorg detected, nothing to recover")]
    NoReorgDetected,

    /// The recovery circuit breaker is open; only a manual reset
    /// resumes processing.
    #[error("Recovery halted awaiting manual intervention: {reason}")]
    Halted { reason: String },
}

/// Result type for reorg recovery operations.
pub type ReorgResult<T> = Result<T, ReorgError>;
