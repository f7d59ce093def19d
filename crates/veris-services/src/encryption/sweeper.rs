// Path: crates/veris-services/src/encryption/sweeper.rs
//! The block-boundary key lifecycle sweeper.
//!
//! Once per block the host drives two passes over the recipient-key space:
//! the expiration sweep emits warnings for keys entering a configured window
//! and revokes keys past their expiry, and the purge sweep deletes revoked
//! keys whose grace period has lapsed. Warning markers under the `0x0B`
//! prefix make the expiration sweep idempotent within a block.

use veris_api::state::StateAccess;
use veris_types::app::{EncryptionEvent, RecipientKey, RotationRecord, RotationState, RotationStatus};
use veris_types::codec;
use veris_types::error::{EncryptionError, StateError};
use veris_types::keys;

use super::EncryptionModule;

impl EncryptionModule {
    /// Runs the expiration sweep. Returns `(warnings_emitted, keys_expired)`.
    pub fn process_key_expirations(
        &self,
        state: &mut dyn StateAccess,
        now: u64,
    ) -> Result<(u64, u64), EncryptionError> {
        let params = self.params(state)?;

        let mut candidates: Vec<RecipientKey> = Vec::new();
        for entry in state.prefix_scan(keys::RECIPIENT_KEY_PREFIX)? {
            let (_, value) = entry?;
            let key: RecipientKey =
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
            if key.revoked_at == 0 && key.expires_at > 0 {
                candidates.push(key);
            }
        }

        let mut warnings = 0u64;
        let mut expired = 0u64;
        for mut key in candidates {
            if key.expires_at <= now {
                key.revoked_at = now;
                if key.deprecated_at == 0 {
                    key.deprecated_at = now;
                }
                if params.revocation_grace_period_seconds > 0 {
                    key.purge_at = now + params.revocation_grace_period_seconds;
                }
                self.save_recipient_key(state, &key)?;
                self.recompute_active_if_pointing(state, &key.address, &key.fingerprint, now)?;
                expired += 1;

                self.emit(EncryptionEvent::KeyExpired {
                    address: key.address,
                    fingerprint: key.fingerprint.clone(),
                    expired_at: now,
                });
                if let Err(e) = self.hooks().after_key_expired(&key.address, &key) {
                    log::debug!("[Encryption] after_key_expired hook failed: {}", e);
                }

                // Migrate envelopes toward the account's best remaining key,
                // when one exists.
                if let Some(replacement) = self.latest_usable_key(state, &key.address, now)? {
                    self.start_expiry_replacement(state, &params, &key, &replacement, now)?;
                }
            } else {
                for &window in &params.key_expiry_warning_seconds {
                    if key.expires_at - now > window {
                        continue;
                    }
                    let marker_key = keys::expiry_warning_key(&key.fingerprint, window);
                    if state.get(&marker_key)?.is_some() {
                        continue;
                    }
                    // The marker is the state transition; a failed emission
                    // must not stop the remaining windows.
                    state.insert(&marker_key, &[1u8])?;
                    self.emit(EncryptionEvent::KeyExpiryWarning {
                        address: key.address,
                        fingerprint: key.fingerprint.clone(),
                        expires_at: key.expires_at,
                        window_seconds: window,
                    });
                    warnings += 1;
                }
            }
        }
        Ok((warnings, expired))
    }

    /// Runs the purge sweep: deletes revoked keys past their grace deadline,
    /// together with their derived indexes and warning markers. Returns the
    /// number of keys purged.
    pub fn purge_revoked_keys(
        &self,
        state: &mut dyn StateAccess,
        now: u64,
    ) -> Result<u64, EncryptionError> {
        let mut purgeable: Vec<RecipientKey> = Vec::new();
        for entry in state.prefix_scan(keys::RECIPIENT_KEY_PREFIX)? {
            let (_, value) = entry?;
            let key: RecipientKey =
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
            if key.is_purgeable(now) {
                purgeable.push(key);
            }
        }

        let purged = purgeable.len() as u64;
        for key in purgeable {
            state.delete(&keys::recipient_key_key(&key.address, &key.fingerprint))?;
            state.delete(&keys::fingerprint_index_key(&key.fingerprint))?;
            state.delete(&keys::version_index_key(&key.address, key.version))?;

            let pointer_key = keys::active_key_key(&key.address);
            let points_here = state
                .get(&pointer_key)?
                .map_or(false, |p| p == key.fingerprint.as_bytes());
            if points_here {
                state.delete(&pointer_key)?;
            }

            let mut markers: Vec<Vec<u8>> = Vec::new();
            for entry in
                state.prefix_scan(&keys::expiry_warning_fingerprint_prefix(&key.fingerprint))?
            {
                let (marker_key, _) = entry?;
                markers.push(marker_key.as_ref().to_vec());
            }
            for marker_key in markers {
                state.delete(&marker_key)?;
            }
        }
        Ok(purged)
    }

    /// Starts the re-encryption campaign that moves an expired key's
    /// envelopes onto `replacement`.
    fn start_expiry_replacement(
        &self,
        state: &mut dyn StateAccess,
        params: &veris_types::service_configs::EncryptionParams,
        expired: &RecipientKey,
        replacement: &RecipientKey,
        now: u64,
    ) -> Result<(), EncryptionError> {
        let outcome = self.queue_reencryption_jobs(
            state,
            &expired.fingerprint,
            &replacement.fingerprint,
            None,
            params.rotation_batch_size,
            now,
        )?;
        if outcome.queued == 0 && outcome.done {
            return Ok(());
        }

        let mut preimage = Vec::new();
        preimage.extend_from_slice(expired.address.as_ref());
        preimage.extend_from_slice(expired.fingerprint.as_bytes());
        preimage.extend_from_slice(replacement.fingerprint.as_bytes());
        preimage.extend_from_slice(&now.to_be_bytes());
        let rotation_id = hex::encode(self.primitives().sha256(&preimage)?);

        let record = RotationRecord {
            rotation_id: rotation_id.clone(),
            address: expired.address,
            reason: "expired key replacement".to_string(),
            old_algorithm_id: expired.algorithm_id.clone(),
            old_algorithm_version: expired.algorithm_version,
            new_algorithm_id: replacement.algorithm_id.clone(),
            new_algorithm_version: replacement.algorithm_version,
            old_fingerprint: expired.fingerprint.clone(),
            new_fingerprint: replacement.fingerprint.clone(),
            initiated_at: now,
            transition_window_end: now,
            status: RotationStatus::InTransition,
            envelopes_pending: outcome.queued,
        };
        let rotation_state = RotationState {
            record,
            cursor: if outcome.done { Vec::new() } else { outcome.cursor },
        };
        let bytes = codec::to_bytes_canonical(&rotation_state).map_err(StateError::InvalidValue)?;
        state.insert(&keys::rotation_state_key(&rotation_id), &bytes)?;

        self.emit(EncryptionEvent::KeyRotated {
            address: expired.address,
            old_fingerprint: expired.fingerprint.clone(),
            new_fingerprint: replacement.fingerprint.clone(),
            rotation_id,
            jobs_queued: outcome.queued,
        });
        Ok(())
    }
}
