// Path: crates/veris-types/src/app/events.rs

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::AccountId;

/// A typed event describing an observable state change in the encryption
/// core. Events are emitted to the host on every state-affecting operation
/// and consumed by indexers and hooks; emission failures never abort the
/// state transition that produced them.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode, PartialEq, Eq)]
pub enum EncryptionEvent {
    /// A new recipient key was registered.
    KeyRegistered {
        /// The owning account.
        address: AccountId,
        /// The new key's fingerprint.
        fingerprint: String,
        /// The algorithm the key belongs to.
        algorithm_id: String,
        /// The per-account key version assigned at registration.
        version: u32,
        /// Block time of the registration.
        registered_at: u64,
    },
    /// A recipient key was revoked by its owner or the authority.
    KeyRevoked {
        /// The owning account.
        address: AccountId,
        /// The revoked key's fingerprint.
        fingerprint: String,
        /// Block time of the revocation.
        revoked_at: u64,
        /// When the key becomes purgeable; 0 if no grace period applies.
        purge_at: u64,
    },
    /// A recipient key's label was updated.
    KeyUpdated {
        /// The owning account.
        address: AccountId,
        /// The updated key's fingerprint.
        fingerprint: String,
        /// The new label.
        label: String,
    },
    /// A key rotation campaign was started.
    KeyRotated {
        /// The owning account.
        address: AccountId,
        /// The outgoing key's fingerprint.
        old_fingerprint: String,
        /// The incoming key's fingerprint.
        new_fingerprint: String,
        /// The campaign id tracking re-encryption progress.
        rotation_id: String,
        /// Number of re-encryption jobs queued in this transaction.
        jobs_queued: u64,
    },
    /// A key passed its expiry and was transitioned to revoked.
    KeyExpired {
        /// The owning account.
        address: AccountId,
        /// The expired key's fingerprint.
        fingerprint: String,
        /// Block time at which the sweeper expired the key.
        expired_at: u64,
    },
    /// A key is approaching its expiry.
    KeyExpiryWarning {
        /// The owning account.
        address: AccountId,
        /// The expiring key's fingerprint.
        fingerprint: String,
        /// The key's expiry time.
        expires_at: u64,
        /// The warning window that triggered this event, in seconds.
        window_seconds: u64,
    },
}
