//! Adapter implementations for the outbound ports.

pub mod leader;
pub mod registry;
pub mod signer;

pub use leader::StaticLeaderSelector;
pub use registry::InMemorySequencerRegistry;
pub use signer::{Ed25519Signer, Ed25519Verifier};
