//! Driven ports (outbound dependencies).

use crate::events::{BlockFinalizedEvent, ConsensusFailedEvent};
use shared_types::{Address, Hash, PublicKey, SequencerInfo, Signature};

/// Sequencer registry: who is eligible and with what weight.
///
/// Backed by the discovery subsystem in production, by an in-memory map
/// in tests. Errors are reported as strings; the service degrades rather
/// than crashing when the registry is unavailable.
pub trait SequencerRegistry: Send + Sync {
    /// All currently eligible sequencers with their weights and pubkeys.
    fn eligible_sequencers(&self) -> Result<Vec<SequencerInfo>, String>;

    /// Look up one sequencer by address.
    fn sequencer_info(&self, address: &Address) -> Result<Option<SequencerInfo>, String>;
}

/// Leader schedule queries and failover signaling.
pub trait LeaderSelector: Send + Sync {
    /// The leader for the given slot.
    fn leader_for_slot(&self, slot_number: u64) -> Result<Address, String>;

    /// Signal that the current slot's leader failed to drive its round to
    /// consensus, so the schedule should fail over to the next candidate.
    fn report_slot_timeout(&self, slot_number: u64, block_hash: Hash);
}

/// Signature verification over 32-byte digests.
///
/// Signatures are re-verified here even when the transport layer claims
/// to have checked them already.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, digest: &Hash, signature: &Signature, public_key: &PublicKey) -> bool;
}

/// Local identity: signs this node's own votes.
pub trait BlockSigner: Send + Sync {
    /// This node's sequencer address.
    fn address(&self) -> Address;

    /// Sign a 32-byte digest with this node's key.
    fn sign(&self, digest: &Hash) -> Result<Signature, String>;
}

/// Observer for round outcomes.
///
/// Callbacks run synchronously after the service lock is released, against
/// a snapshot of the observer list; a panicking observer is logged and
/// does not disturb the round or other observers.
pub trait ConsensusObserver: Send + Sync {
    /// A block reached the weighted threshold and was finalized.
    fn on_block_finalized(&self, event: &BlockFinalizedEvent);

    /// A round ended without consensus.
    fn on_consensus_failed(&self, event: &ConsensusFailedEvent);
}

/// Time source for timestamp validation.
pub trait TimeSource: Send + Sync {
    /// Current unix timestamp in seconds.
    fn now(&self) -> u64;
}

/// Default time source using system time.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}
