// Path: crates/veris-services/src/encryption/rotation.rs
//! Key rotation and the re-encryption engine.
//!
//! A rotation deprecates the old key, registers its replacement, and starts a
//! campaign that migrates every stored envelope referencing the old key. The
//! campaign's work is chunked: each call queues or processes at most a batch,
//! and a persisted cursor lets the scan resume deterministically in a later
//! block. Job progress is persisted per job, so an aborted batch never loses
//! completed work.

use veris_api::crypto::ReencryptionWorker;
use veris_api::state::StateAccess;
use veris_types::app::{
    AccountId, EncryptionEvent, EnvelopeRecord, ReencryptionJob, ReencryptionJobStatus,
    RotationRecord, RotationState, RotationStatus,
};
use veris_types::codec;
use veris_types::error::{EncryptionError, StateError};
use veris_types::keys;

use super::EncryptionModule;

/// A job is failed permanently once it has consumed this many attempts.
const MAX_JOB_ATTEMPTS: u32 = 3;

/// Outcome of one enqueue pass.
pub struct QueueOutcome {
    /// Jobs queued in this pass.
    pub queued: u64,
    /// Whether the envelope scan reached the end of the store.
    pub done: bool,
    /// The last store key scanned; the resumption cursor when `done` is
    /// false.
    pub cursor: Vec<u8>,
}

impl EncryptionModule {
    /// Rotates `old_fingerprint` to a newly registered key and starts the
    /// re-encryption campaign. Returns the new key's fingerprint.
    #[allow(clippy::too_many_arguments)]
    pub fn rotate_recipient_key(
        &self,
        state: &mut dyn StateAccess,
        signer: &AccountId,
        old_fingerprint: &str,
        new_public_key: &[u8],
        new_algorithm_id: &str,
        new_label: &str,
        reason: &str,
        new_ttl_seconds: u64,
        transition_days: u32,
        now: u64,
    ) -> Result<String, EncryptionError> {
        let address = *signer;
        let params = self.params(state)?;

        let mut old_key = self.get_recipient_key(state, &address, old_fingerprint)?;
        if old_key.revoked_at != 0 {
            return Err(EncryptionError::KeyRevoked(old_fingerprint.to_string()));
        }
        if self.has_open_rotation(state, old_fingerprint)? {
            return Err(EncryptionError::KeyRotationInProgress(
                old_fingerprint.to_string(),
            ));
        }

        let new_fingerprint = self.register_recipient_key(
            state,
            &address,
            new_public_key,
            new_algorithm_id,
            new_label,
            now,
        )?;
        // Registration applies the params TTL; an explicit rotation TTL
        // overrides it.
        if new_ttl_seconds > 0 {
            let mut new_key = self.get_recipient_key(state, &address, &new_fingerprint)?;
            new_key.expires_at = now + new_ttl_seconds;
            self.save_recipient_key(state, &new_key)?;
        }

        old_key.deprecated_at = now;
        self.save_recipient_key(state, &old_key)?;

        let rotation_id = self.rotation_id(&address, old_fingerprint, &new_fingerprint, now)?;
        let new_key = self.get_recipient_key(state, &address, &new_fingerprint)?;
        let outcome = self.queue_reencryption_jobs(
            state,
            old_fingerprint,
            &new_fingerprint,
            None,
            params.rotation_batch_size,
            now,
        )?;

        let record = RotationRecord {
            rotation_id: rotation_id.clone(),
            address,
            reason: reason.to_string(),
            old_algorithm_id: old_key.algorithm_id.clone(),
            old_algorithm_version: old_key.algorithm_version,
            new_algorithm_id: new_key.algorithm_id.clone(),
            new_algorithm_version: new_key.algorithm_version,
            old_fingerprint: old_fingerprint.to_string(),
            new_fingerprint: new_fingerprint.clone(),
            initiated_at: now,
            transition_window_end: now + u64::from(transition_days) * 86400,
            status: RotationStatus::InTransition,
            envelopes_pending: outcome.queued,
        };
        let rotation_state = RotationState {
            record,
            cursor: if outcome.done { Vec::new() } else { outcome.cursor },
        };
        self.save_rotation_state(state, &rotation_state)?;

        self.emit(EncryptionEvent::KeyRotated {
            address,
            old_fingerprint: old_fingerprint.to_string(),
            new_fingerprint: new_fingerprint.clone(),
            rotation_id,
            jobs_queued: outcome.queued,
        });
        if let Err(e) =
            self.hooks()
                .after_key_rotated(&address, old_fingerprint, &new_fingerprint)
        {
            log::debug!("[Encryption] after_key_rotated hook failed: {}", e);
        }

        Ok(new_fingerprint)
    }

    /// Scans the envelope store for envelopes referencing `old_fingerprint`
    /// and queues one re-encryption job per match, starting after `cursor`.
    ///
    /// Stops once `limit` jobs have been queued or the scan completes. The
    /// scan order is the byte-lex order of envelope store keys, so two nodes
    /// replaying the same state queue identical jobs.
    pub fn queue_reencryption_jobs(
        &self,
        state: &mut dyn StateAccess,
        old_fingerprint: &str,
        new_fingerprint: &str,
        cursor: Option<&[u8]>,
        limit: u32,
        now: u64,
    ) -> Result<QueueOutcome, EncryptionError> {
        // Collect matches first: the scan borrows the state that job writes
        // need mutably.
        let mut candidates: Vec<Vec<u8>> = Vec::new();
        let mut scanned_past_limit = false;
        let mut last_key: Vec<u8> = cursor.map(|c| c.to_vec()).unwrap_or_default();
        for entry in state.prefix_scan(keys::ENVELOPE_RECORD_PREFIX)? {
            let (key, value) = entry?;
            if let Some(cursor) = cursor {
                if key.as_ref() <= cursor {
                    continue;
                }
            }
            let record: EnvelopeRecord =
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
            if candidates.len() >= limit as usize {
                // One more matching key would have been queued; remember
                // that the scan is unfinished.
                if record.envelope.has_recipient(old_fingerprint) {
                    scanned_past_limit = true;
                    break;
                }
                continue;
            }
            if record.envelope.has_recipient(old_fingerprint) {
                candidates.push(key.as_ref().to_vec());
            }
            last_key = key.as_ref().to_vec();
        }
        let done = !scanned_past_limit;

        let mut queued = 0u64;
        for store_key in candidates {
            let job_id = self.reencryption_job_id(&store_key, old_fingerprint, new_fingerprint)?;
            let job_key = keys::reencryption_job_key(&job_id);
            if state.get(&job_key)?.is_some() {
                // At most one job per (envelope, old, new) triple, ever.
                continue;
            }
            let envelope_hash = store_key
                .strip_prefix(keys::ENVELOPE_RECORD_PREFIX)
                .map(|suffix| String::from_utf8_lossy(suffix).into_owned())
                .unwrap_or_default();
            let job = ReencryptionJob {
                job_id: job_id.clone(),
                envelope_hash,
                old_fingerprint: old_fingerprint.to_string(),
                new_fingerprint: new_fingerprint.to_string(),
                status: ReencryptionJobStatus::Pending,
                attempts: 0,
                last_error: String::new(),
                created_at: now,
                updated_at: now,
            };
            self.save_reencryption_job(state, &job)?;
            queued += 1;
        }

        Ok(QueueOutcome {
            queued,
            done,
            cursor: last_key,
        })
    }

    /// Processes pending re-encryption jobs through `worker`, in byte-lex
    /// job-id order, handling at most `limit` jobs. Returns the number of
    /// envelopes successfully re-encrypted.
    ///
    /// Progress is persisted per job: a failure in one job records its error
    /// and moves on, and a host-level abort of the surrounding transaction
    /// never un-completes previously committed jobs.
    pub fn process_reencryption_jobs(
        &self,
        state: &mut dyn StateAccess,
        worker: &dyn ReencryptionWorker,
        limit: u32,
        now: u64,
    ) -> Result<u64, EncryptionError> {
        let mut jobs: Vec<ReencryptionJob> = Vec::new();
        for entry in state.prefix_scan(keys::REENCRYPTION_JOB_PREFIX)? {
            let (_, value) = entry?;
            let job: ReencryptionJob =
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
            if job.status == ReencryptionJobStatus::Pending {
                jobs.push(job);
            }
            if jobs.len() >= limit as usize {
                break;
            }
        }

        let mut processed = 0u64;
        for mut job in jobs {
            match self.run_reencryption_job(state, worker, &job, now) {
                Ok(()) => {
                    job.status = ReencryptionJobStatus::Completed;
                    job.updated_at = now;
                    self.save_reencryption_job(state, &job)?;
                    self.settle_campaign_progress(state, &job, true)?;
                    processed += 1;
                }
                Err(e) => {
                    job.attempts += 1;
                    job.last_error = e.to_string();
                    if job.attempts >= MAX_JOB_ATTEMPTS {
                        job.status = ReencryptionJobStatus::Failed;
                        self.settle_campaign_progress(state, &job, false)?;
                    }
                    job.updated_at = now;
                    self.save_reencryption_job(state, &job)?;
                    log::warn!(
                        "[Encryption] re-encryption job {} attempt {} failed: {}",
                        job.job_id,
                        job.attempts,
                        e
                    );
                }
            }
        }
        Ok(processed)
    }

    /// Resumes enqueueing for every in-transition campaign whose envelope
    /// scan was interrupted mid-way.
    pub fn resume_rotation_scans(
        &self,
        state: &mut dyn StateAccess,
        now: u64,
    ) -> Result<u64, EncryptionError> {
        let params = self.params(state)?;
        let mut states: Vec<RotationState> = Vec::new();
        for entry in state.prefix_scan(keys::ROTATION_STATE_PREFIX)? {
            let (_, value) = entry?;
            let rotation: RotationState =
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
            if rotation.record.status == RotationStatus::InTransition
                && !rotation.cursor.is_empty()
            {
                states.push(rotation);
            }
        }

        let mut queued_total = 0u64;
        for mut rotation in states {
            let outcome = self.queue_reencryption_jobs(
                state,
                &rotation.record.old_fingerprint,
                &rotation.record.new_fingerprint,
                Some(&rotation.cursor),
                params.rotation_batch_size,
                now,
            )?;
            rotation.record.envelopes_pending += outcome.queued;
            rotation.cursor = if outcome.done { Vec::new() } else { outcome.cursor };
            self.save_rotation_state(state, &rotation)?;
            queued_total += outcome.queued;
        }
        Ok(queued_total)
    }

    /// Loads a rotation campaign's state.
    pub fn get_rotation_state(
        &self,
        state: &dyn StateAccess,
        rotation_id: &str,
    ) -> Result<RotationState, EncryptionError> {
        let bytes = state
            .get(&keys::rotation_state_key(rotation_id))?
            .ok_or_else(|| EncryptionError::KeyRotationNotFound(rotation_id.to_string()))?;
        codec::from_bytes_canonical(&bytes).map_err(|e| StateError::Decode(e).into())
    }

    // --- internal helpers ---

    /// Executes the worker for one job and replaces the stored envelope.
    fn run_reencryption_job(
        &self,
        state: &mut dyn StateAccess,
        worker: &dyn ReencryptionWorker,
        job: &ReencryptionJob,
        now: u64,
    ) -> Result<(), EncryptionError> {
        let store_key = keys::envelope_record_key(&job.envelope_hash);
        let record_bytes = state
            .get(&store_key)?
            .ok_or_else(|| EncryptionError::ReencryptionJobFailed("envelope not found".into()))?;
        let mut record: EnvelopeRecord =
            codec::from_bytes_canonical(&record_bytes).map_err(StateError::Decode)?;

        let old_key = self
            .get_recipient_key_by_fingerprint(state, &job.old_fingerprint)
            .map_err(|_| EncryptionError::ReencryptionJobFailed("old key not found".into()))?;
        let new_key = self
            .get_recipient_key_by_fingerprint(state, &job.new_fingerprint)
            .map_err(|_| EncryptionError::ReencryptionJobFailed("new key not found".into()))?;

        let replacement = worker.reencrypt(&record.envelope, &old_key, &new_key)?;

        record.envelope = replacement;
        record.rotation_count += 1;
        record.updated_at = now;
        let bytes = codec::to_bytes_canonical(&record).map_err(StateError::InvalidValue)?;
        state.insert(&store_key, &bytes)?;
        Ok(())
    }

    /// Books one finished job against its campaign, completing or failing
    /// the campaign when the last pending envelope settles.
    fn settle_campaign_progress(
        &self,
        state: &mut dyn StateAccess,
        job: &ReencryptionJob,
        success: bool,
    ) -> Result<(), EncryptionError> {
        let mut campaigns: Vec<RotationState> = Vec::new();
        for entry in state.prefix_scan(keys::ROTATION_STATE_PREFIX)? {
            let (_, value) = entry?;
            let rotation: RotationState =
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
            if rotation.record.old_fingerprint == job.old_fingerprint
                && rotation.record.new_fingerprint == job.new_fingerprint
                && rotation.record.status == RotationStatus::InTransition
            {
                campaigns.push(rotation);
            }
        }
        for mut rotation in campaigns {
            rotation.record.envelopes_pending =
                rotation.record.envelopes_pending.saturating_sub(1);
            if !success {
                rotation.record.status = RotationStatus::Failed;
            } else if rotation.record.envelopes_pending == 0 && rotation.cursor.is_empty() {
                rotation.record.status = RotationStatus::Completed;
            }
            self.save_rotation_state(state, &rotation)?;
        }
        Ok(())
    }

    /// Whether any in-transition campaign is already rotating away from
    /// `fingerprint`.
    fn has_open_rotation(
        &self,
        state: &dyn StateAccess,
        fingerprint: &str,
    ) -> Result<bool, EncryptionError> {
        for entry in state.prefix_scan(keys::ROTATION_STATE_PREFIX)? {
            let (_, value) = entry?;
            let rotation: RotationState =
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
            if rotation.record.status == RotationStatus::InTransition
                && rotation.record.old_fingerprint == fingerprint
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn save_rotation_state(
        &self,
        state: &mut dyn StateAccess,
        rotation: &RotationState,
    ) -> Result<(), EncryptionError> {
        let bytes = codec::to_bytes_canonical(rotation).map_err(StateError::InvalidValue)?;
        state.insert(
            &keys::rotation_state_key(&rotation.record.rotation_id),
            &bytes,
        )?;
        Ok(())
    }

    pub(crate) fn save_reencryption_job(
        &self,
        state: &mut dyn StateAccess,
        job: &ReencryptionJob,
    ) -> Result<(), EncryptionError> {
        let bytes = codec::to_bytes_canonical(job).map_err(StateError::InvalidValue)?;
        state.insert(&keys::reencryption_job_key(&job.job_id), &bytes)?;
        Ok(())
    }

    /// Deterministic campaign id: SHA-256 over the account, both
    /// fingerprints, and the initiation time.
    fn rotation_id(
        &self,
        address: &AccountId,
        old_fingerprint: &str,
        new_fingerprint: &str,
        now: u64,
    ) -> Result<String, EncryptionError> {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(address.as_ref());
        preimage.extend_from_slice(old_fingerprint.as_bytes());
        preimage.extend_from_slice(new_fingerprint.as_bytes());
        preimage.extend_from_slice(&now.to_be_bytes());
        Ok(hex::encode(self.primitives().sha256(&preimage)?))
    }

    /// Deterministic job id: SHA-256 over the envelope store key and both
    /// fingerprints.
    fn reencryption_job_id(
        &self,
        envelope_store_key: &[u8],
        old_fingerprint: &str,
        new_fingerprint: &str,
    ) -> Result<String, EncryptionError> {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(envelope_store_key);
        preimage.extend_from_slice(old_fingerprint.as_bytes());
        preimage.extend_from_slice(new_fingerprint.as_bytes());
        Ok(hex::encode(self.primitives().sha256(&preimage)?))
    }
}
