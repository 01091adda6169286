//! Weighted-BFT sequencer consensus.
//!
//! A committee of weighted sequencers votes on L2 block proposals; a
//! block finalizes when the weighted accept fraction reaches the
//! configured threshold (default 2/3 of total eligible weight). Rounds
//! that cannot reach the threshold fail early and trigger leader
//! failover.
//!
//! # Architecture (Hexagonal)
//!
//! - `domain/` — proposals, votes, tallying, round state machine
//! - `ports/` — inbound API and outbound dependencies
//! - `adapters/` — in-memory registry, static leader schedule, Ed25519
//! - `service/` — the lock-protected service driving it all
//! - `events/` — observer event payloads

pub mod adapters;
pub mod domain;
pub mod error;
pub mod events;
pub mod ports;
pub mod service;

pub use adapters::{Ed25519Signer, Ed25519Verifier, InMemorySequencerRegistry, StaticLeaderSelector};
pub use domain::{
    BlockProposal, ConsensusConfig, ConsensusState, ConsensusThreshold, FinalizedBlock,
    SequencerWeights, Vote, VoteValue, WeightedConsensusResult,
};
pub use error::{ConsensusError, ConsensusResult};
pub use events::{BlockFinalizedEvent, ConsensusFailedEvent};
pub use ports::{
    BlockSigner, ConsensusApi, ConsensusObserver, LeaderSelector, SequencerRegistry,
    SignatureVerifier, SystemTimeSource, TimeSource,
};
pub use service::ConsensusService;
