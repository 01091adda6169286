//! Port definitions (hexagonal architecture).
//!
//! - Inbound: the recovery API driven by the L1 header feed and operators
//! - Outbound: the state executor and reorg observers

pub mod inbound;
pub mod outbound;

pub use inbound::{ReorgRecoveryApi, ReorgStatistics};
pub use outbound::{ExecutionOutcome, ReorgObserver, StateExecutor};
