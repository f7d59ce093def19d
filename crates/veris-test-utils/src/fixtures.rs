// Path: crates/veris-test-utils/src/fixtures.rs
//! Deterministic key and envelope fixtures.
//!
//! Fixture key pairs are derived from a single seed byte, so tests can name
//! the same key in multiple places without threading state around. Sealed
//! fixture envelopes use the same wrapped-key layout as the operator-side
//! re-encryption worker: a 24-byte nonce prefix followed by the sealed DEK.

use veris_api::crypto::EnvelopePrimitives;
use veris_api::transaction::context::TxContext;
use veris_types::app::{compute_fingerprint, AccountId, Envelope, WrappedKey};
use veris_types::app::{ALG_X25519_XSALSA20_POLY1305, ENVELOPE_FORMAT_VERSION};
use veris_types::error::EncryptionError;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

/// Length of the nonce prefix inside a wrapped key.
const WRAP_NONCE_LEN: usize = 24;

/// A deterministic X25519 key pair with its fingerprint.
#[derive(Clone, Debug)]
pub struct FixtureKeyPair {
    /// The public key bytes.
    pub public_key: Vec<u8>,
    /// The private key bytes.
    pub private_key: Vec<u8>,
    /// The fingerprint of `public_key`.
    pub fingerprint: String,
}

/// Derives the fixture key pair for `seed`.
pub fn fixture_keypair(seed: u8) -> FixtureKeyPair {
    let secret = StaticSecret::from([seed; 32]);
    let public = X25519PublicKey::from(&secret);
    let public_key = public.as_bytes().to_vec();
    let fingerprint = compute_fingerprint(&public_key).expect("sha256 is available in tests");
    FixtureKeyPair {
        public_key,
        private_key: secret.to_bytes().to_vec(),
        fingerprint,
    }
}

/// Builds a `TxContext` for tests.
pub fn test_ctx(signer: AccountId, height: u64, timestamp: u64) -> TxContext {
    TxContext {
        block_height: height,
        block_timestamp: timestamp,
        chain_id: 1.into(),
        signer_account_id: signer,
        is_internal: false,
    }
}

/// Seals `payload` into a valid envelope addressed to `recipients`, signed
/// with the Ed25519 seed `sender_seed`. The `seed` byte varies the DEK and
/// nonces so that distinct envelopes get distinct content addresses.
pub fn seal_envelope(
    primitives: &dyn EnvelopePrimitives,
    recipients: &[&FixtureKeyPair],
    payload: &[u8],
    sender_seed: [u8; 32],
    seed: u8,
) -> Result<Envelope, EncryptionError> {
    let dek = primitives.sha256(&[b"TEST-DEK".as_slice(), &[seed]].concat())?;
    let nonce_full = primitives.sha256(&[b"TEST-NONCE".as_slice(), &[seed]].concat())?;
    let nonce = nonce_full[..WRAP_NONCE_LEN].to_vec();
    let ciphertext = primitives.aead_seal(&dek, &nonce, payload)?;

    let mut recipient_key_ids = Vec::new();
    let mut wrapped_keys = Vec::new();
    for (i, recipient) in recipients.iter().enumerate() {
        let ephemeral = StaticSecret::from([seed.wrapping_add(i as u8).wrapping_add(100); 32]);
        let ephemeral_public = X25519PublicKey::from(&ephemeral);
        let kek = primitives.dh_shared_secret(&ephemeral.to_bytes(), &recipient.public_key)?;

        let wrap_nonce_full = primitives.sha256(
            &[b"TEST-WRAP".as_slice(), recipient.fingerprint.as_bytes()].concat(),
        )?;
        let wrap_nonce = &wrap_nonce_full[..WRAP_NONCE_LEN];
        let mut wrapped = wrap_nonce.to_vec();
        wrapped.extend_from_slice(&primitives.aead_seal(&kek, wrap_nonce, &dek)?);

        recipient_key_ids.push(recipient.fingerprint.clone());
        wrapped_keys.push(WrappedKey {
            recipient_key_id: recipient.fingerprint.clone(),
            wrapped_key: wrapped,
            wrap_algorithm: ALG_X25519_XSALSA20_POLY1305.to_string(),
            ephemeral_public_key: ephemeral_public.as_bytes().to_vec(),
        });
    }

    let mut envelope = Envelope {
        version: ENVELOPE_FORMAT_VERSION,
        algorithm_id: ALG_X25519_XSALSA20_POLY1305.to_string(),
        algorithm_version: 1,
        recipient_key_ids,
        recipient_public_keys: Vec::new(),
        encrypted_keys: Vec::new(),
        wrapped_keys,
        nonce,
        ciphertext,
        sender_pub_key: veris_crypto::primitives::ed25519_public_from_seed(&sender_seed)?,
        sender_signature: Vec::new(),
        metadata: Default::default(),
    };
    let signing_payload = envelope.signing_payload()?;
    envelope.sender_signature = primitives.sign(&sender_seed, &signing_payload)?;
    Ok(envelope)
}

/// Opens a fixture (or re-encrypted) envelope with a recipient's private
/// key, returning the plaintext.
pub fn open_envelope(
    primitives: &dyn EnvelopePrimitives,
    envelope: &Envelope,
    recipient: &FixtureKeyPair,
) -> Result<Vec<u8>, EncryptionError> {
    let wrapped = envelope
        .wrapped_key_for(&recipient.fingerprint)
        .ok_or_else(|| EncryptionError::NotRecipient(recipient.fingerprint.clone()))?;
    if wrapped.wrapped_key.len() <= WRAP_NONCE_LEN {
        return Err(EncryptionError::DecryptionFailed(
            "wrapped key too short".into(),
        ));
    }
    let kek = primitives.dh_shared_secret(&recipient.private_key, &wrapped.ephemeral_public_key)?;
    let (wrap_nonce, sealed) = wrapped.wrapped_key.split_at(WRAP_NONCE_LEN);
    let dek = primitives.aead_open(&kek, wrap_nonce, sealed)?;
    let plaintext = primitives.aead_open(&dek, &envelope.nonce, &envelope.ciphertext)?;
    Ok(plaintext.to_vec())
}
