// Path: crates/veris-types/src/keys/mod.rs
//! Defines constants for well-known state keys.
//!
//! These constants provide a single source of truth for the byte-level key
//! layout used to store the encryption core's records in the state manager.
//! Every key starts with a single-byte prefix; record bodies are encoded with
//! the canonical codec in [`crate::codec`]. Using these builders prevents
//! typos and ensures that primary records and their derived indexes are
//! always addressed consistently.

use crate::app::AccountId;

/// Prefix for primary recipient-key records, keyed by `address | fingerprint`.
pub const RECIPIENT_KEY_PREFIX: &[u8] = &[0x01];
/// Prefix for the fingerprint-to-address reverse index.
pub const FINGERPRINT_INDEX_PREFIX: &[u8] = &[0x02];
/// The state key for the module parameters.
pub const PARAMS_KEY: &[u8] = &[0x03];
/// Prefix for optional envelope log entries, keyed by envelope hash.
pub const ENVELOPE_LOG_PREFIX: &[u8] = &[0x04];
/// Prefix for the per-account active-key pointer.
pub const ACTIVE_KEY_PREFIX: &[u8] = &[0x05];
/// Prefix for the `(address, version)` to fingerprint index.
pub const VERSION_INDEX_PREFIX: &[u8] = &[0x06];
/// Prefix for stored envelope records, keyed by envelope hash.
pub const ENVELOPE_RECORD_PREFIX: &[u8] = &[0x07];
/// Prefix for persisted re-encryption jobs, keyed by job id.
pub const REENCRYPTION_JOB_PREFIX: &[u8] = &[0x08];
/// Prefix for rotation campaign state, keyed by rotation id.
pub const ROTATION_STATE_PREFIX: &[u8] = &[0x09];
/// Prefix for ephemeral session keys, keyed by session id.
pub const EPHEMERAL_KEY_PREFIX: &[u8] = &[0x0A];
/// Prefix for expiry-warning markers, keyed by `fingerprint | window`.
pub const EXPIRY_WARNING_PREFIX: &[u8] = &[0x0B];

/// Builds the primary record key for a recipient key.
pub fn recipient_key_key(address: &AccountId, fingerprint: &str) -> Vec<u8> {
    [RECIPIENT_KEY_PREFIX, address.as_ref(), fingerprint.as_bytes()].concat()
}

/// Builds the prefix under which all of an account's recipient keys live.
pub fn recipient_key_account_prefix(address: &AccountId) -> Vec<u8> {
    [RECIPIENT_KEY_PREFIX, address.as_ref()].concat()
}

/// Builds the reverse-index key mapping a fingerprint to its owning address.
pub fn fingerprint_index_key(fingerprint: &str) -> Vec<u8> {
    [FINGERPRINT_INDEX_PREFIX, fingerprint.as_bytes()].concat()
}

/// Builds the per-account active-key pointer key.
pub fn active_key_key(address: &AccountId) -> Vec<u8> {
    [ACTIVE_KEY_PREFIX, address.as_ref()].concat()
}

/// Builds the `(address, version)` index key. The version is big-endian so
/// that byte-lex iteration over an account's entries is version-ordered.
pub fn version_index_key(address: &AccountId, version: u32) -> Vec<u8> {
    [VERSION_INDEX_PREFIX, address.as_ref(), &version.to_be_bytes()].concat()
}

/// Builds the storage key for an envelope record from its content hash.
pub fn envelope_record_key(envelope_hash: &str) -> Vec<u8> {
    [ENVELOPE_RECORD_PREFIX, envelope_hash.as_bytes()].concat()
}

/// Builds the storage key for a re-encryption job.
pub fn reencryption_job_key(job_id: &str) -> Vec<u8> {
    [REENCRYPTION_JOB_PREFIX, job_id.as_bytes()].concat()
}

/// Builds the storage key for a rotation campaign's state.
pub fn rotation_state_key(rotation_id: &str) -> Vec<u8> {
    [ROTATION_STATE_PREFIX, rotation_id.as_bytes()].concat()
}

/// Builds the storage key for an ephemeral session key.
pub fn ephemeral_key_key(session_id: &str) -> Vec<u8> {
    [EPHEMERAL_KEY_PREFIX, session_id.as_bytes()].concat()
}

/// Builds the marker key that gates duplicate expiry warnings for a
/// `(fingerprint, window)` pair. The window is big-endian for stable layout.
pub fn expiry_warning_key(fingerprint: &str, window_seconds: u64) -> Vec<u8> {
    [
        EXPIRY_WARNING_PREFIX,
        fingerprint.as_bytes(),
        &window_seconds.to_be_bytes(),
    ]
    .concat()
}

/// Builds the prefix under which all of a fingerprint's warning markers live.
pub fn expiry_warning_fingerprint_prefix(fingerprint: &str) -> Vec<u8> {
    [EXPIRY_WARNING_PREFIX, fingerprint.as_bytes()].concat()
}
