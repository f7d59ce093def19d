// Path: crates/veris-types/src/app/envelope.rs

//! The canonical multi-recipient authenticated envelope.
//!
//! An envelope carries one AEAD-sealed payload plus a per-recipient wrapping
//! of the data-encryption key. Three derived forms matter for consensus:
//!
//! * the **signing payload**, a SHA-256 digest binding the fields a sender
//!   commits to;
//! * the **envelope hash**, the content address under which the record is
//!   stored;
//! * the **deterministic bytes**, a canonical serialization that is invariant
//!   under permutation of recipient entries and metadata iteration order, so
//!   that independent nodes agree byte-for-byte.

use crate::error::EncryptionError;
use crate::service_configs::EncryptionParams;
use dcrypt::algorithms::hash::{HashFunction, Sha256 as DcryptSha256};
use dcrypt::algorithms::ByteSerializable;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::algorithm;

/// The envelope format version produced by this build.
pub const ENVELOPE_FORMAT_VERSION: u32 = 1;
/// The highest envelope format version this build understands.
pub const MAX_ENVELOPE_FORMAT_VERSION: u32 = 1;
/// Number of leading SHA-256 bytes that form a key fingerprint.
pub const FINGERPRINT_PREFIX_LEN: usize = 20;
/// The literal separator between a fingerprint and its version suffix.
const RECIPIENT_ID_VERSION_SEPARATOR: &str = ":v";

/// Hashes `data` with SHA-256, mapping provider failures into the module's
/// error space.
fn sha256(data: &[u8]) -> Result<[u8; 32], EncryptionError> {
    let digest = DcryptSha256::digest(data)
        .map_err(|e| EncryptionError::EncryptionFailed(format!("sha256 failed: {}", e)))?;
    digest
        .to_bytes()
        .try_into()
        .map_err(|_| EncryptionError::EncryptionFailed("sha256 digest length".into()))
}

/// Computes the canonical fingerprint of a public key: the lowercase-hex
/// encoding of the first [`FINGERPRINT_PREFIX_LEN`] bytes of SHA-256(key).
pub fn compute_fingerprint(public_key: &[u8]) -> Result<String, EncryptionError> {
    let digest = sha256(public_key)?;
    Ok(hex::encode(&digest[..FINGERPRINT_PREFIX_LEN]))
}

/// Splits a recipient key id into its fingerprint part and optional version.
///
/// Accepts either a bare fingerprint (`"ab…"`) or the versioned form
/// `"<fp>:v<n>"`. Anything after a `:v` separator that is not a decimal
/// number is treated as part of an unversioned id.
pub fn split_recipient_key_id(id: &str) -> (&str, Option<u32>) {
    if let Some((fp, version)) = id.split_once(RECIPIENT_ID_VERSION_SEPARATOR) {
        if let Ok(v) = version.parse::<u32>() {
            return (fp, Some(v));
        }
    }
    (id, None)
}

/// Formats a versioned recipient key id.
pub fn versioned_recipient_key_id(fingerprint: &str, version: u32) -> String {
    format!("{}{}{}", fingerprint, RECIPIENT_ID_VERSION_SEPARATOR, version)
}

/// A per-recipient wrapped data-encryption key.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
)]
pub struct WrappedKey {
    /// The recipient this wrapping is for (bare or versioned fingerprint).
    pub recipient_key_id: String,
    /// The wrapped DEK bytes.
    pub wrapped_key: Vec<u8>,
    /// The id of the algorithm used for the wrapping.
    pub wrap_algorithm: String,
    /// The sender's ephemeral public key used for this wrapping.
    pub ephemeral_public_key: Vec<u8>,
}

/// The canonical multi-recipient authenticated envelope record.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
)]
pub struct Envelope {
    /// Envelope format version; must be `1..=MAX_ENVELOPE_FORMAT_VERSION`.
    pub version: u32,
    /// The algorithm catalog id this envelope was sealed with.
    pub algorithm_id: String,
    /// The algorithm version; must match the registry's current version.
    pub algorithm_version: u32,
    /// Recipient key ids (bare or versioned fingerprints).
    pub recipient_key_ids: Vec<String>,
    /// Optional recipient public keys, index-aligned with
    /// `recipient_key_ids`; each must hash to its fingerprint.
    pub recipient_public_keys: Vec<Vec<u8>>,
    /// Optional per-recipient encrypted DEKs, index-aligned with
    /// `recipient_key_ids`.
    pub encrypted_keys: Vec<Vec<u8>>,
    /// Optional structured per-recipient wrappings; every entry must name a
    /// recipient present in `recipient_key_ids`.
    pub wrapped_keys: Vec<WrappedKey>,
    /// AEAD nonce; length must equal the algorithm's nonce size.
    pub nonce: Vec<u8>,
    /// The sealed payload; never empty.
    pub ciphertext: Vec<u8>,
    /// The sender's public key; length must equal the algorithm's key size.
    pub sender_pub_key: Vec<u8>,
    /// Signature over the signing payload, by `sender_pub_key`.
    pub sender_signature: Vec<u8>,
    /// Application metadata. A `BTreeMap` keeps keys unique and iteration
    /// deterministic.
    pub metadata: BTreeMap<String, String>,
}

impl Envelope {
    /// Validates the envelope's structure against the registry and policy.
    ///
    /// All checks run before any state is touched; a failed validation never
    /// mutates anything.
    pub fn validate(&self, params: &EncryptionParams) -> Result<(), EncryptionError> {
        if self.version == 0 {
            return Err(EncryptionError::InvalidEnvelope(
                "envelope version must be at least 1".into(),
            ));
        }
        if self.version > MAX_ENVELOPE_FORMAT_VERSION {
            return Err(EncryptionError::UnsupportedVersion {
                max: MAX_ENVELOPE_FORMAT_VERSION,
                got: self.version,
            });
        }

        let info = algorithm::get_info(&self.algorithm_id)
            .ok_or_else(|| EncryptionError::UnsupportedAlgorithm(self.algorithm_id.clone()))?;
        if !params.allowed_algorithms.is_empty()
            && !params
                .allowed_algorithms
                .iter()
                .any(|a| a == &self.algorithm_id)
        {
            return Err(EncryptionError::UnsupportedAlgorithm(format!(
                "{} is not allowed by policy",
                self.algorithm_id
            )));
        }
        if self.algorithm_version != info.version {
            return Err(EncryptionError::UnsupportedAlgorithm(format!(
                "{} version {} does not match registry version {}",
                self.algorithm_id, self.algorithm_version, info.version
            )));
        }

        if self.nonce.len() != info.nonce_size {
            return Err(EncryptionError::InvalidEnvelope(format!(
                "nonce length {} does not match algorithm nonce size {}",
                self.nonce.len(),
                info.nonce_size
            )));
        }
        if self.sender_pub_key.len() != info.key_size {
            return Err(EncryptionError::InvalidEnvelope(format!(
                "sender public key length {} does not match algorithm key size {}",
                self.sender_pub_key.len(),
                info.key_size
            )));
        }
        if self.ciphertext.is_empty() {
            return Err(EncryptionError::InvalidEnvelope(
                "ciphertext must not be empty".into(),
            ));
        }

        if self.recipient_key_ids.is_empty() {
            return Err(EncryptionError::InvalidEnvelope(
                "envelope must name at least one recipient".into(),
            ));
        }
        if self.recipient_key_ids.len() > params.max_recipients_per_envelope as usize {
            return Err(EncryptionError::MaxRecipientsExceeded {
                max: params.max_recipients_per_envelope,
                got: self.recipient_key_ids.len() as u32,
            });
        }

        if params.require_signature && self.sender_signature.is_empty() {
            return Err(EncryptionError::InvalidEnvelope(
                "sender signature is required by policy".into(),
            ));
        }

        if !self.recipient_public_keys.is_empty() {
            if self.recipient_public_keys.len() != self.recipient_key_ids.len() {
                return Err(EncryptionError::InvalidEnvelope(
                    "recipient public keys do not align with recipient key ids".into(),
                ));
            }
            for (id, pk) in self
                .recipient_key_ids
                .iter()
                .zip(self.recipient_public_keys.iter())
            {
                let (fingerprint, _) = split_recipient_key_id(id);
                if compute_fingerprint(pk)? != fingerprint {
                    return Err(EncryptionError::InvalidEnvelope(format!(
                        "recipient public key does not match fingerprint {}",
                        fingerprint
                    )));
                }
            }
        }

        if !self.encrypted_keys.is_empty()
            && self.encrypted_keys.len() != self.recipient_key_ids.len()
        {
            return Err(EncryptionError::InvalidEnvelope(
                "encrypted keys do not align with recipient key ids".into(),
            ));
        }

        let recipients: BTreeSet<&str> = self
            .recipient_key_ids
            .iter()
            .map(|id| split_recipient_key_id(id).0)
            .collect();
        let mut wrapped_seen: BTreeSet<&str> = BTreeSet::new();
        for wrapped in &self.wrapped_keys {
            if wrapped.recipient_key_id.is_empty() {
                return Err(EncryptionError::InvalidEnvelope(
                    "wrapped key with empty recipient id".into(),
                ));
            }
            if wrapped.wrapped_key.is_empty() {
                return Err(EncryptionError::InvalidEnvelope(format!(
                    "wrapped key for {} is empty",
                    wrapped.recipient_key_id
                )));
            }
            let (fingerprint, _) = split_recipient_key_id(&wrapped.recipient_key_id);
            if !wrapped_seen.insert(fingerprint) {
                return Err(EncryptionError::InvalidEnvelope(format!(
                    "duplicate wrapped key for recipient {}",
                    fingerprint
                )));
            }
            if !recipients.contains(fingerprint) {
                return Err(EncryptionError::InvalidEnvelope(format!(
                    "wrapped key recipient {} is not listed in recipient key ids",
                    fingerprint
                )));
            }
        }

        for key in self.metadata.keys() {
            if key.is_empty() {
                return Err(EncryptionError::InvalidEnvelope(
                    "metadata keys must not be empty".into(),
                ));
            }
        }

        Ok(())
    }

    /// Computes the SHA-256 signing payload the sender commits to.
    ///
    /// The digest covers, in order: the big-endian format version, the
    /// algorithm id, the big-endian algorithm version, the ciphertext, the
    /// nonce, and each recipient key id in the order given by the envelope.
    pub fn signing_payload(&self) -> Result<[u8; 32], EncryptionError> {
        self.payload_digest(self.recipient_key_ids.iter().map(|s| s.as_str()))
    }

    /// Computes the envelope's stable content address: the lowercase-hex
    /// SHA-256 of the signing payload, with the recipient listing
    /// canonicalized into lexicographic order so that envelopes differing
    /// only by recipient permutation share one address.
    pub fn hash(&self) -> Result<String, EncryptionError> {
        let mut ids: Vec<&str> = self.recipient_key_ids.iter().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        let payload = self.payload_digest(ids.into_iter())?;
        Ok(hex::encode(sha256(&payload)?))
    }

    /// The shared field layout behind both the signing payload and the
    /// content address; `ids` decides the recipient ordering.
    fn payload_digest<'a>(
        &self,
        ids: impl Iterator<Item = &'a str>,
    ) -> Result<[u8; 32], EncryptionError> {
        let mut preimage = Vec::with_capacity(
            8 + self.algorithm_id.len() + self.ciphertext.len() + self.nonce.len(),
        );
        preimage.extend_from_slice(&self.version.to_be_bytes());
        preimage.extend_from_slice(self.algorithm_id.as_bytes());
        preimage.extend_from_slice(&self.algorithm_version.to_be_bytes());
        preimage.extend_from_slice(&self.ciphertext);
        preimage.extend_from_slice(&self.nonce);
        for id in ids {
            preimage.extend_from_slice(id.as_bytes());
        }
        sha256(&preimage)
    }

    /// Produces the canonical byte serialization used for cross-validator
    /// agreement.
    ///
    /// Recipient entries are re-ordered into the lexicographic order of their
    /// ids, with per-recipient arrays rewritten to follow; wrapped-key slots
    /// with no entry are padded with empty tuples. Metadata is emitted in
    /// ascending key order. The output is identical regardless of the input's
    /// recipient order or map iteration order.
    pub fn deterministic_bytes(&self) -> Vec<u8> {
        let mut order: Vec<usize> = (0..self.recipient_key_ids.len()).collect();
        order.sort_by(|&a, &b| self.recipient_key_ids[a].cmp(&self.recipient_key_ids[b]));

        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_be_bytes());
        put_bytes(&mut out, self.algorithm_id.as_bytes());
        out.extend_from_slice(&self.algorithm_version.to_be_bytes());
        put_bytes(&mut out, &self.nonce);
        put_bytes(&mut out, &self.ciphertext);
        put_bytes(&mut out, &self.sender_pub_key);
        put_bytes(&mut out, &self.sender_signature);

        out.extend_from_slice(&(order.len() as u32).to_be_bytes());
        for &i in &order {
            let id = &self.recipient_key_ids[i];
            put_bytes(&mut out, id.as_bytes());
            put_bytes(
                &mut out,
                self.recipient_public_keys
                    .get(i)
                    .map_or(&[][..], |v| v.as_slice()),
            );
            put_bytes(
                &mut out,
                self.encrypted_keys.get(i).map_or(&[][..], |v| v.as_slice()),
            );

            let (fingerprint, _) = split_recipient_key_id(id);
            match self.wrapped_key_for(fingerprint) {
                Some(wrapped) => {
                    put_bytes(&mut out, &wrapped.wrapped_key);
                    put_bytes(&mut out, wrapped.wrap_algorithm.as_bytes());
                    put_bytes(&mut out, &wrapped.ephemeral_public_key);
                }
                None => {
                    put_bytes(&mut out, &[]);
                    put_bytes(&mut out, &[]);
                    put_bytes(&mut out, &[]);
                }
            }
        }

        out.extend_from_slice(&(self.metadata.len() as u32).to_be_bytes());
        for (key, value) in &self.metadata {
            put_bytes(&mut out, key.as_bytes());
            put_bytes(&mut out, value.as_bytes());
        }
        out
    }

    /// Finds the wrapped key addressed to `fingerprint`, matching versioned
    /// ids by their fingerprint part.
    pub fn wrapped_key_for(&self, fingerprint: &str) -> Option<&WrappedKey> {
        self.wrapped_keys
            .iter()
            .find(|w| split_recipient_key_id(&w.recipient_key_id).0 == fingerprint)
    }

    /// Whether `fingerprint` is among the envelope's recipients, matching
    /// versioned ids by their fingerprint part.
    pub fn has_recipient(&self, fingerprint: &str) -> bool {
        self.recipient_key_ids
            .iter()
            .any(|id| split_recipient_key_id(id).0 == fingerprint)
    }
}

/// Appends a big-endian u32 length prefix followed by the bytes themselves.
fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// The storage wrapper around an envelope.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EnvelopeRecord {
    /// The stored envelope.
    pub envelope: Envelope,
    /// Unix seconds when the record was first stored.
    pub created_at: u64,
    /// Unix seconds of the last mutation (re-encryption).
    pub updated_at: u64,
    /// Number of successful re-encryptions applied to this record.
    pub rotation_count: u32,
}
