// Path: crates/veris-types/src/app/mod.rs
//! Core application-level data structures of the encryption core.

/// The algorithm registry: catalog, families, statuses and size validation.
pub mod algorithm;
/// The canonical multi-recipient authenticated envelope and its codec.
pub mod envelope;
/// Typed lifecycle events emitted to the host.
pub mod events;
/// Data structures for on-chain identity, including the canonical AccountId.
pub mod identity;
/// Recipient keys, ephemeral session keys, and rotation records.
pub mod keyring;

pub use algorithm::{
    default_algorithm, get_info, is_supported, supported_algorithms, validate_params,
    AlgorithmFamily, AlgorithmInfo, AlgorithmStatus, ALG_KYBER768_XSALSA20_POLY1305,
    ALG_X25519_KYBER768_XSALSA20_POLY1305, ALG_X25519_XSALSA20_POLY1305,
};
pub use envelope::{
    compute_fingerprint, split_recipient_key_id, versioned_recipient_key_id, Envelope,
    EnvelopeRecord, WrappedKey, ENVELOPE_FORMAT_VERSION, FINGERPRINT_PREFIX_LEN,
    MAX_ENVELOPE_FORMAT_VERSION,
};
pub use events::EncryptionEvent;
pub use identity::{AccountId, ChainId};
pub use keyring::{
    EphemeralKey, RecipientKey, ReencryptionJob, ReencryptionJobStatus, RotationRecord,
    RotationState, RotationStatus,
};
