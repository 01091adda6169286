//! # Core Domain Entities
//!
//! Defines the entities shared between the consensus and reorg-recovery
//! subsystems and the ports they expose to external collaborators.
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Address`, `PublicKey`, `Signature`, `ChainId`
//! - **Committee**: `SequencerInfo`
//! - **Execution**: `RawTransaction`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Keccak256};

/// A 32-byte hash (Keccak-256).
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 20-byte sequencer address, derived from the public key.
pub type Address = [u8; 20];

/// L2 chain identifier.
pub type ChainId = u64;

/// Default L2 chain ID used when none is configured.
pub const DEFAULT_L2_CHAIN_ID: ChainId = 1;

/// Compute the Keccak-256 hash of a byte slice.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive a 20-byte address from an Ed25519 public key.
///
/// The address is the trailing 20 bytes of the Keccak-256 of the key.
pub fn address_from_pubkey(pubkey: &PublicKey) -> Address {
    let digest = keccak256(pubkey);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..32]);
    address
}

/// A committee member authorized to propose and vote on L2 blocks.
///
/// Rows of this shape are served by the Sequencer Registry; the consensus
/// core treats the registry as authoritative for eligibility and weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerInfo {
    /// Sequencer address (identity for voting).
    pub address: Address,
    /// Stake/reputation weight used in the weighted BFT threshold.
    pub weight: u64,
    /// Ed25519 public key for vote and proposal verification.
    pub pubkey: PublicKey,
}

impl SequencerInfo {
    pub fn new(address: Address, weight: u64, pubkey: PublicKey) -> Self {
        Self {
            address,
            weight,
            pubkey,
        }
    }
}

/// A raw L2 transaction.
///
/// This is the unit the State Executor applies, and the shape the reorg
/// recovery subsystem serializes into its replay log.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Sender address.
    pub from: Address,
    /// Recipient address.
    pub to: Address,
    /// Sender nonce, prevents replay across rounds.
    pub nonce: u64,
    /// Transferred value in base units.
    pub value: u128,
    /// Call data / payload.
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,
}

impl RawTransaction {
    /// Compute the transaction content hash.
    pub fn hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(self.from);
        hasher.update(self.to);
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.value.to_le_bytes());
        hasher.update(&self.payload);
        hasher.finalize().into()
    }

    /// Serialize for the replay log.
    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("RawTransaction serialization is infallible")
    }

    /// Deserialize from the replay log.
    pub fn decode(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> RawTransaction {
        RawTransaction {
            from: [0xAA; 20],
            to: [0xBB; 20],
            nonce: 7,
            value: 1_000_000,
            payload: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_tx_hash_is_stable() {
        assert_eq!(sample_tx().hash(), sample_tx().hash());
    }

    #[test]
    fn test_tx_hash_changes_with_nonce() {
        let mut other = sample_tx();
        other.nonce += 1;
        assert_ne!(sample_tx().hash(), other.hash());
    }

    #[test]
    fn test_tx_encode_decode_roundtrip() {
        let tx = sample_tx();
        let decoded = RawTransaction::decode(&tx.encode()).unwrap();
        assert_eq!(tx, decoded);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(RawTransaction::decode(&[0xFF, 0x00, 0x13]).is_err());
    }

    #[test]
    fn test_address_from_pubkey_is_deterministic() {
        let pk = [3u8; 32];
        assert_eq!(address_from_pubkey(&pk), address_from_pubkey(&pk));
        assert_ne!(address_from_pubkey(&pk), address_from_pubkey(&[4u8; 32]));
    }
}
