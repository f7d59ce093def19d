// Path: crates/veris-api/src/crypto/mod.rs
//! Defines the primitives port and the re-encryption worker port.

use veris_types::app::{Envelope, RecipientKey};
use veris_types::error::EncryptionError;
use zeroize::Zeroizing;

/// A freshly generated key pair. The private half is zeroized on drop and
/// must never be persisted by the core.
pub struct GeneratedKeyPair {
    /// The public key bytes.
    pub public_key: Vec<u8>,
    /// The private key bytes, zeroized on drop.
    pub private_key: Zeroizing<Vec<u8>>,
}

/// The external primitives provider the encryption core calls.
///
/// Every operation except key generation is a pure function of its inputs:
/// identical inputs must yield identical outputs on every node, because
/// these operations sit on the consensus replay path. Key generation draws
/// from the provider's entropy source and is only invoked for caller-facing
/// material (ephemeral session keys), never during block replay.
pub trait EnvelopePrimitives: Send + Sync {
    /// Generates a fresh key pair for the envelope scheme.
    fn generate_keypair(&self) -> Result<GeneratedKeyPair, EncryptionError>;

    /// Computes the Diffie-Hellman shared secret between a private key and a
    /// peer's public key.
    fn dh_shared_secret(
        &self,
        private_key: &[u8],
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EncryptionError>;

    /// Seals `plaintext` under `key` and `nonce` with the scheme's AEAD.
    fn aead_seal(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, EncryptionError>;

    /// Opens `ciphertext` under `key` and `nonce`, verifying its tag.
    fn aead_open(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EncryptionError>;

    /// Computes SHA-256 of `data`.
    fn sha256(&self, data: &[u8]) -> Result<[u8; 32], EncryptionError>;

    /// Signs `message` with the sender signing key.
    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, EncryptionError>;

    /// Verifies `signature` over `message` against `public_key`.
    fn verify(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), EncryptionError>;
}

/// The narrow port the rotation engine drives to migrate one envelope.
///
/// The worker is responsible for opening the envelope's DEK with key material
/// it holds outside the core (validator enclaves or operator-side stores),
/// re-wrapping it for the new recipient with a fresh ephemeral sender key,
/// re-sealing the payload, and copying metadata. The returned envelope must
/// preserve the semantic plaintext: opening it under the new recipient's
/// private key yields the same bytes the old recipient would have read.
pub trait ReencryptionWorker: Send + Sync {
    /// Produces the re-encrypted replacement for `envelope`, moving the
    /// wrapping from `old_key` to `new_key`.
    fn reencrypt(
        &self,
        envelope: &Envelope,
        old_key: &RecipientKey,
        new_key: &RecipientKey,
    ) -> Result<Envelope, EncryptionError>;
}
