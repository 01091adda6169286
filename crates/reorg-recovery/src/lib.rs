//! L1 reorg detection and L2 state recovery.
//!
//! Tracks observed L1 headers, anchors L2 state roots to L1 blocks, and
//! when the L1 chain reorganizes below an anchored height, reverts L2
//! state to the last valid anchor and deterministically replays the
//! logged transactions. Reorgs deeper than the configured bound halt the
//! component for manual intervention instead of guessing.
//!
//! # Architecture (Hexagonal)
//!
//! - `domain/` — L1 history, anchors, transaction log, circuit breaker
//! - `ports/` — inbound API and the state-executor dependency
//! - `adapters/` — deterministic in-memory executor
//! - `service/` — the lock-protected service driving it all
//! - `events/` — observer event payloads

pub mod adapters;
pub mod domain;
pub mod error;
pub mod events;
pub mod ports;
pub mod service;

pub use adapters::InMemoryStateExecutor;
pub use domain::{
    AnchorPoint, L1BlockInfo, RecoveryState, ReorgConfig, ReorgDetection, ReorgRecovery,
    ReplayOutcome, TransactionLogEntry,
};
pub use error::{ReorgError, ReorgResult};
pub use events::ReorgEvent;
pub use ports::{ReorgObserver, ReorgRecoveryApi, ReorgStatistics, StateExecutor};
pub use service::ReorgRecoveryService;
