// Path: crates/veris-types/src/app/keyring.rs

//! Records for the per-account recipient-key registry, ephemeral session
//! keys, and the key-rotation machinery.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::AccountId;

/// A registered recipient key for an account.
///
/// All timestamps are unix seconds with `0` meaning unset. `registered_at`
/// is immutable after registration; `version` is strictly monotone within an
/// account.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RecipientKey {
    /// The owning account.
    pub address: AccountId,
    /// The raw public key bytes; length matches the algorithm's key size.
    pub public_key: Vec<u8>,
    /// The globally unique fingerprint of `public_key`.
    pub fingerprint: String,
    /// Per-account monotone version, starting at 1.
    pub version: u32,
    /// The algorithm catalog id this key belongs to.
    pub algorithm_id: String,
    /// The algorithm version at registration time.
    pub algorithm_version: u32,
    /// Mutable, caller-supplied display label.
    pub label: String,
    /// When the key was registered.
    pub registered_at: u64,
    /// When the key was deprecated by a rotation; 0 if never.
    pub deprecated_at: u64,
    /// When the key was revoked; 0 if never.
    pub revoked_at: u64,
    /// When the key expires; 0 for no expiry.
    pub expires_at: u64,
    /// When a revoked key becomes purgeable; 0 if no grace period applies.
    pub purge_at: u64,
}

impl RecipientKey {
    /// The usability predicate: a key is usable at `now` iff it is neither
    /// revoked nor deprecated and has not reached its expiry.
    pub fn is_usable(&self, now: u64) -> bool {
        self.revoked_at == 0
            && self.deprecated_at == 0
            && (self.expires_at == 0 || now < self.expires_at)
    }

    /// Whether a purge sweep at `now` may delete this key.
    pub fn is_purgeable(&self, now: u64) -> bool {
        self.revoked_at != 0 && self.purge_at != 0 && now >= self.purge_at
    }
}

/// A short-lived, single-use session key bound to an account and a height.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EphemeralKey {
    /// Deterministic session id derived from address, key and height.
    pub session_id: String,
    /// The account the session belongs to.
    pub address: AccountId,
    /// The session's public key. The private half is returned to the caller
    /// once and never stored.
    pub public_key: Vec<u8>,
    /// Block time at creation.
    pub created_at: u64,
    /// Expiry time; 0 for no TTL.
    pub expires_at: u64,
    /// First-use time; non-zero means any further use is rejected.
    pub used_at: u64,
}

/// Status of a single persisted re-encryption job.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReencryptionJobStatus {
    /// Queued, not yet attempted or retriable.
    Pending,
    /// The envelope was successfully re-encrypted.
    Completed,
    /// Permanently failed after exhausting attempts.
    Failed,
}

/// One envelope's migration from an old recipient key to a new one.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReencryptionJob {
    /// SHA-256 over the envelope store key, old and new fingerprints.
    pub job_id: String,
    /// Hex content address of the envelope to migrate.
    pub envelope_hash: String,
    /// The fingerprint being rotated away from.
    pub old_fingerprint: String,
    /// The fingerprint being rotated to.
    pub new_fingerprint: String,
    /// Current job status.
    pub status: ReencryptionJobStatus,
    /// Number of worker attempts so far.
    pub attempts: u32,
    /// The last worker error, if any.
    pub last_error: String,
    /// Unix seconds when the job was queued.
    pub created_at: u64,
    /// Unix seconds of the last status change.
    pub updated_at: u64,
}

/// Overall status of a rotation campaign.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationStatus {
    /// The campaign was created but no jobs have been queued yet.
    Initiated,
    /// Old and new keys are simultaneously valid; jobs are being processed.
    InTransition,
    /// Every matching envelope has been migrated.
    Completed,
    /// The campaign failed permanently.
    Failed,
    /// The campaign was reverted by governance.
    RolledBack,
}

/// Metadata describing one rotation campaign.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RotationRecord {
    /// Unique campaign id.
    pub rotation_id: String,
    /// The account whose key is rotating.
    pub address: AccountId,
    /// Caller-supplied reason, surfaced in events and audit trails.
    pub reason: String,
    /// Algorithm id of the outgoing key.
    pub old_algorithm_id: String,
    /// Algorithm version of the outgoing key.
    pub old_algorithm_version: u32,
    /// Algorithm id of the incoming key.
    pub new_algorithm_id: String,
    /// Algorithm version of the incoming key.
    pub new_algorithm_version: u32,
    /// Fingerprint of the outgoing key.
    pub old_fingerprint: String,
    /// Fingerprint of the incoming key.
    pub new_fingerprint: String,
    /// Unix seconds when the campaign started.
    pub initiated_at: u64,
    /// End of the window during which both keys are valid.
    pub transition_window_end: u64,
    /// Campaign status.
    pub status: RotationStatus,
    /// Envelopes known to still need migration.
    pub envelopes_pending: u64,
}

/// A rotation campaign's persisted state: its record plus the resumption
/// cursor for the envelope scan.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RotationState {
    /// Campaign metadata.
    pub record: RotationRecord,
    /// Last envelope store key scanned when a batch ended mid-scan; empty
    /// when the scan is complete or not yet started.
    pub cursor: Vec<u8>,
}
