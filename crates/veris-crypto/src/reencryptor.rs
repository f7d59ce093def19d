// Path: crates/veris-crypto/src/reencryptor.rs
//! An operator-side implementation of the rotation engine's worker port.
//!
//! The chain core never holds long-lived private keys; re-encryption needs
//! them. `LocalKeyReencryptor` bridges that gap for operators (or validator
//! enclaves) that hold recipient private keys alongside the node: it opens
//! the old wrapping, decrypts the payload, and produces a replacement
//! envelope addressed to the new key.
//!
//! All ephemeral material (replacement DEK, nonces, ephemeral sender DH key)
//! is derived deterministically from the job inputs, so independent
//! validators running the same worker over the same state produce identical
//! replacement envelopes.
//!
//! Wrapped-key layout: the first 24 bytes of `wrapped_key` are the secretbox
//! nonce, the remainder is the sealed DEK.

use std::collections::BTreeMap;

use crate::error::EncryptionError;
use veris_api::crypto::{EnvelopePrimitives, ReencryptionWorker};
use veris_types::app::{Envelope, RecipientKey, WrappedKey};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Secretbox nonce length, also the length of the nonce prefix inside a
/// wrapped key.
const WRAP_NONCE_LEN: usize = 24;
/// X25519 key length; the only key size this worker can wrap for.
const DH_KEY_LEN: usize = 32;

/// A re-encryption worker backed by locally held recipient private keys.
pub struct LocalKeyReencryptor<P: EnvelopePrimitives> {
    primitives: P,
    /// Recipient private keys by fingerprint, held outside the chain state.
    recipient_keys: BTreeMap<String, Zeroizing<Vec<u8>>>,
    /// Ed25519 seed used to re-sign replacement envelopes.
    sender_seed: Zeroizing<Vec<u8>>,
    /// The verify key matching `sender_seed`.
    sender_public: Vec<u8>,
}

impl<P: EnvelopePrimitives> LocalKeyReencryptor<P> {
    /// Creates a worker that signs replacement envelopes with `sender_seed`.
    pub fn new(primitives: P, sender_seed: [u8; 32]) -> Result<Self, EncryptionError> {
        use dcrypt::sign::eddsa::Ed25519SecretKey;
        let secret = Ed25519SecretKey::from_seed(&sender_seed).map_err(|e| {
            EncryptionError::InvalidSignature(format!("failed to load sender seed: {:?}", e))
        })?;
        let public = secret.public_key().map_err(|e| {
            EncryptionError::InvalidSignature(format!("failed to derive sender key: {:?}", e))
        })?;
        Ok(Self {
            primitives,
            recipient_keys: BTreeMap::new(),
            sender_seed: Zeroizing::new(sender_seed.to_vec()),
            sender_public: public.to_bytes().to_vec(),
        })
    }

    /// Registers the private key for a recipient fingerprint.
    pub fn add_recipient_key(&mut self, fingerprint: impl Into<String>, private_key: Vec<u8>) {
        self.recipient_keys
            .insert(fingerprint.into(), Zeroizing::new(private_key));
    }

    /// The worker's envelope verify key.
    pub fn sender_public_key(&self) -> &[u8] {
        &self.sender_public
    }

    /// Derives 32 deterministic bytes bound to `label` and the given inputs.
    fn derive(&self, label: &[u8], parts: &[&[u8]]) -> Result<[u8; 32], EncryptionError> {
        let mut preimage = label.to_vec();
        for part in parts {
            preimage.extend_from_slice(&(part.len() as u32).to_be_bytes());
            preimage.extend_from_slice(part);
        }
        self.primitives.sha256(&preimage)
    }

    /// Opens the DEK wrapped for `old_key` in `envelope`.
    fn open_dek(
        &self,
        envelope: &Envelope,
        old_key: &RecipientKey,
    ) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
        let wrapped = envelope
            .wrapped_key_for(&old_key.fingerprint)
            .ok_or_else(|| EncryptionError::NotRecipient(old_key.fingerprint.clone()))?;
        if wrapped.wrapped_key.len() <= WRAP_NONCE_LEN {
            return Err(EncryptionError::DecryptionFailed(
                "wrapped key too short to carry a nonce".into(),
            ));
        }

        let private = self
            .recipient_keys
            .get(&old_key.fingerprint)
            .ok_or_else(|| {
                EncryptionError::KeyNotFound(format!(
                    "no local private key for {}",
                    old_key.fingerprint
                ))
            })?;

        let kek = self
            .primitives
            .dh_shared_secret(private.as_slice(), &wrapped.ephemeral_public_key)?;
        let (nonce, sealed) = wrapped.wrapped_key.split_at(WRAP_NONCE_LEN);
        self.primitives.aead_open(kek.as_slice(), nonce, sealed)
    }
}

impl<P: EnvelopePrimitives> ReencryptionWorker for LocalKeyReencryptor<P> {
    fn reencrypt(
        &self,
        envelope: &Envelope,
        old_key: &RecipientKey,
        new_key: &RecipientKey,
    ) -> Result<Envelope, EncryptionError> {
        if new_key.public_key.len() != DH_KEY_LEN {
            return Err(EncryptionError::EncryptionFailed(format!(
                "local worker can only wrap for {}-byte keys, got {}",
                DH_KEY_LEN,
                new_key.public_key.len()
            )));
        }

        let old_dek = self.open_dek(envelope, old_key)?;
        let plaintext = self
            .primitives
            .aead_open(old_dek.as_slice(), &envelope.nonce, &envelope.ciphertext)?;

        // Fresh, deterministically derived material for the replacement.
        let new_dek = self.derive(
            b"VERIS-REENC-DEK/V1",
            &[old_dek.as_slice(), new_key.fingerprint.as_bytes()],
        )?;
        let payload_nonce_full = self.derive(
            b"VERIS-REENC-NONCE/V1",
            &[old_dek.as_slice(), new_key.fingerprint.as_bytes()],
        )?;
        let (payload_nonce, _) = payload_nonce_full.split_at(WRAP_NONCE_LEN);

        let ephemeral_seed = self.derive(
            b"VERIS-REENC-EPH/V1",
            &[
                old_dek.as_slice(),
                new_key.fingerprint.as_bytes(),
                &new_key.public_key,
            ],
        )?;
        let ephemeral_secret = StaticSecret::from(ephemeral_seed);
        let ephemeral_public = X25519PublicKey::from(&ephemeral_secret);

        let kek = self
            .primitives
            .dh_shared_secret(&ephemeral_secret.to_bytes(), &new_key.public_key)?;
        let wrap_nonce_full = self.derive(
            b"VERIS-REENC-WRAP/V1",
            &[ephemeral_public.as_bytes(), new_key.fingerprint.as_bytes()],
        )?;
        let (wrap_nonce, _) = wrap_nonce_full.split_at(WRAP_NONCE_LEN);
        let mut wrapped = wrap_nonce.to_vec();
        wrapped.extend_from_slice(&self.primitives.aead_seal(kek.as_slice(), wrap_nonce, &new_dek)?);

        let mut replacement = envelope.clone();
        replacement.nonce = payload_nonce.to_vec();
        replacement.ciphertext = self
            .primitives
            .aead_seal(&new_dek, payload_nonce, &plaintext)?;

        // Rewrite the recipient listing from the old id to the new one.
        let mut replaced_index = None;
        for (i, id) in replacement.recipient_key_ids.iter_mut().enumerate() {
            let (fingerprint, _) = veris_types::app::split_recipient_key_id(id);
            if fingerprint == old_key.fingerprint {
                *id = new_key.fingerprint.clone();
                replaced_index = Some(i);
                break;
            }
        }
        let replaced_index = replaced_index
            .ok_or_else(|| EncryptionError::NotRecipient(old_key.fingerprint.clone()))?;
        if let Some(slot) = replacement.recipient_public_keys.get_mut(replaced_index) {
            *slot = new_key.public_key.clone();
        }
        if let Some(slot) = replacement.encrypted_keys.get_mut(replaced_index) {
            *slot = wrapped.clone();
        }
        replacement.wrapped_keys.retain(|w| {
            veris_types::app::split_recipient_key_id(&w.recipient_key_id).0 != old_key.fingerprint
        });
        replacement.wrapped_keys.push(WrappedKey {
            recipient_key_id: new_key.fingerprint.clone(),
            wrapped_key: wrapped,
            wrap_algorithm: new_key.algorithm_id.clone(),
            ephemeral_public_key: ephemeral_public.as_bytes().to_vec(),
        });

        // Re-sign under the worker's sender identity.
        replacement.sender_pub_key = self.sender_public.clone();
        let payload = replacement.signing_payload()?;
        replacement.sender_signature = self.primitives.sign(self.sender_seed.as_slice(), &payload)?;

        Ok(replacement)
    }
}
