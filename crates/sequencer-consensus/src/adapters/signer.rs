//! Ed25519 signing and verification adapters.

use crate::ports::outbound::{BlockSigner, SignatureVerifier};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use shared_types::{address_from_pubkey, Address, Hash, PublicKey, Signature};

/// Signs this node's votes with an Ed25519 key.
///
/// The sequencer address is derived from the public key the same way the
/// registry derives it, so votes self-attribute correctly.
pub struct Ed25519Signer {
    key: SigningKey,
    address: Address,
}

impl Ed25519Signer {
    pub fn new(secret: [u8; 32]) -> Self {
        let key = SigningKey::from_bytes(&secret);
        let address = address_from_pubkey(&key.verifying_key().to_bytes());
        Self { key, address }
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.verifying_key().to_bytes()
    }
}

impl BlockSigner for Ed25519Signer {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, digest: &Hash) -> Result<Signature, String> {
        Ok(self.key.sign(digest).to_bytes())
    }
}

/// Verifies Ed25519 signatures over 32-byte digests.
#[derive(Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, digest: &Hash, signature: &Signature, public_key: &PublicKey) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(public_key) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(signature);
        key.verify_strict(digest, &sig).is_ok()
    }
}
