//! Port definitions (hexagonal architecture).
//!
//! - Inbound: the consensus API driven by the node runtime
//! - Outbound: registry, leader selection, signing, time, observers

pub mod inbound;
pub mod outbound;

pub use inbound::ConsensusApi;
pub use outbound::{
    BlockSigner, ConsensusObserver, LeaderSelector, SequencerRegistry, SignatureVerifier,
    SystemTimeSource, TimeSource,
};
