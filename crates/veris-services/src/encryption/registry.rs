// Path: crates/veris-services/src/encryption/registry.rs
//! The per-account recipient-key registry.
//!
//! The primary record under `0x01 | address | fingerprint` is the owner of
//! all key data; the fingerprint index, version index and active pointer are
//! derived views and are always written in the same transaction as the
//! primary record, so readers never observe them out of sync.

use veris_api::state::StateAccess;
use veris_types::app::{
    algorithm, compute_fingerprint, split_recipient_key_id, AccountId, EncryptionEvent,
    RecipientKey,
};
use veris_types::codec;
use veris_types::error::{EncryptionError, StateError};
use veris_types::keys;

use super::EncryptionModule;

impl EncryptionModule {
    /// Registers a new recipient key for `address` and returns its
    /// fingerprint.
    ///
    /// The key receives `version = max(existing) + 1` and, when the params
    /// configure a default TTL, an expiry. The new key becomes the account's
    /// active key.
    pub fn register_recipient_key(
        &self,
        state: &mut dyn StateAccess,
        address: &AccountId,
        public_key: &[u8],
        algorithm_id: &str,
        label: &str,
        now: u64,
    ) -> Result<String, EncryptionError> {
        let params = self.params(state)?;

        let info = algorithm::get_info(algorithm_id)
            .ok_or_else(|| EncryptionError::UnsupportedAlgorithm(algorithm_id.to_string()))?;
        if !params.allowed_algorithms.is_empty()
            && !params.allowed_algorithms.iter().any(|a| a == algorithm_id)
        {
            return Err(EncryptionError::UnsupportedAlgorithm(format!(
                "{} is not allowed by policy",
                algorithm_id
            )));
        }
        if !info.is_usable() {
            return Err(EncryptionError::UnsupportedAlgorithm(format!(
                "{} is not usable for new keys",
                algorithm_id
            )));
        }
        if public_key.len() != info.key_size {
            return Err(EncryptionError::InvalidPublicKey(format!(
                "expected {} bytes for {}, got {}",
                info.key_size,
                algorithm_id,
                public_key.len()
            )));
        }

        let existing = self.scan_account_keys(state, address)?;
        if existing.len() >= params.max_keys_per_account as usize {
            return Err(EncryptionError::InvalidPublicKey(format!(
                "max keys limit of {} reached for account",
                params.max_keys_per_account
            )));
        }

        let fingerprint = compute_fingerprint(public_key)?;
        if state.get(&keys::fingerprint_index_key(&fingerprint))?.is_some() {
            return Err(EncryptionError::KeyAlreadyExists(fingerprint));
        }

        let version = existing.iter().map(|k| k.version).max().unwrap_or(0) + 1;
        let expires_at = if params.default_key_ttl_seconds > 0 {
            now + params.default_key_ttl_seconds
        } else {
            0
        };

        let key = RecipientKey {
            address: *address,
            public_key: public_key.to_vec(),
            fingerprint: fingerprint.clone(),
            version,
            algorithm_id: algorithm_id.to_string(),
            algorithm_version: info.version,
            label: label.to_string(),
            registered_at: now,
            deprecated_at: 0,
            revoked_at: 0,
            expires_at,
            purge_at: 0,
        };

        self.save_recipient_key(state, &key)?;
        state.insert(
            &keys::fingerprint_index_key(&fingerprint),
            address.as_ref(),
        )?;
        state.insert(
            &keys::version_index_key(address, version),
            fingerprint.as_bytes(),
        )?;
        state.insert(&keys::active_key_key(address), fingerprint.as_bytes())?;

        self.emit(EncryptionEvent::KeyRegistered {
            address: *address,
            fingerprint: fingerprint.clone(),
            algorithm_id: algorithm_id.to_string(),
            version,
            registered_at: now,
        });

        Ok(fingerprint)
    }

    /// Updates the display label of an existing key.
    pub fn update_key_label(
        &self,
        state: &mut dyn StateAccess,
        address: &AccountId,
        fingerprint: &str,
        label: &str,
    ) -> Result<(), EncryptionError> {
        let mut key = self.get_recipient_key(state, address, fingerprint)?;
        key.label = label.to_string();
        self.save_recipient_key(state, &key)?;

        self.emit(EncryptionEvent::KeyUpdated {
            address: *address,
            fingerprint: fingerprint.to_string(),
            label: label.to_string(),
        });
        Ok(())
    }

    /// Revokes a key. Permitted to the owning account and to the configured
    /// authority. Revoking the active key recomputes the active pointer to
    /// the highest-version key that is still usable.
    pub fn revoke_recipient_key(
        &self,
        state: &mut dyn StateAccess,
        signer: &AccountId,
        address: &AccountId,
        fingerprint: &str,
        now: u64,
    ) -> Result<(), EncryptionError> {
        if !self.is_owner_or_authority(signer, address) {
            return Err(EncryptionError::Unauthorized(
                "only the key owner or the authority may revoke".into(),
            ));
        }

        let params = self.params(state)?;
        let mut key = self.get_recipient_key(state, address, fingerprint)?;
        if key.revoked_at != 0 {
            return Err(EncryptionError::KeyRevoked(fingerprint.to_string()));
        }

        key.revoked_at = now;
        if params.revocation_grace_period_seconds > 0 {
            key.purge_at = now + params.revocation_grace_period_seconds;
        }
        self.save_recipient_key(state, &key)?;
        self.recompute_active_if_pointing(state, address, fingerprint, now)?;

        self.emit(EncryptionEvent::KeyRevoked {
            address: *address,
            fingerprint: fingerprint.to_string(),
            revoked_at: now,
            purge_at: key.purge_at,
        });
        if let Err(e) = self.hooks().after_key_revoked(address, &key) {
            log::debug!("[Encryption] after_key_revoked hook failed: {}", e);
        }
        Ok(())
    }

    /// Returns the account's active recipient key.
    ///
    /// The stored pointer is trusted while it still points at a usable key;
    /// otherwise the registry recomputes the pointer by scanning the
    /// account's keys for the usable one with the highest version, persists
    /// it, and returns that key.
    pub fn get_active_recipient_key(
        &self,
        state: &mut dyn StateAccess,
        address: &AccountId,
        now: u64,
    ) -> Result<RecipientKey, EncryptionError> {
        if let Some(pointer) = state.get(&keys::active_key_key(address))? {
            let fingerprint = String::from_utf8(pointer).map_err(|_| {
                StateError::InvalidValue("active pointer is not valid UTF-8".into())
            })?;
            if let Ok(key) = self.get_recipient_key(state, address, &fingerprint) {
                if key.is_usable(now) {
                    return Ok(key);
                }
            }
        }

        match self.latest_usable_key(state, address, now)? {
            Some(key) => {
                state.insert(&keys::active_key_key(address), key.fingerprint.as_bytes())?;
                Ok(key)
            }
            None => Err(EncryptionError::KeyNotFound(format!(
                "no usable recipient key for {}",
                address
            ))),
        }
    }

    /// Loads a key owned by `address` under `fingerprint`.
    pub fn get_recipient_key(
        &self,
        state: &dyn StateAccess,
        address: &AccountId,
        fingerprint: &str,
    ) -> Result<RecipientKey, EncryptionError> {
        let bytes = state
            .get(&keys::recipient_key_key(address, fingerprint))?
            .ok_or_else(|| EncryptionError::KeyNotFound(fingerprint.to_string()))?;
        codec::from_bytes_canonical(&bytes).map_err(|e| StateError::Decode(e).into())
    }

    /// Looks a key up by fingerprint alone, via the global reverse index.
    pub fn get_recipient_key_by_fingerprint(
        &self,
        state: &dyn StateAccess,
        fingerprint: &str,
    ) -> Result<RecipientKey, EncryptionError> {
        let address_bytes = state
            .get(&keys::fingerprint_index_key(fingerprint))?
            .ok_or_else(|| EncryptionError::KeyNotFound(fingerprint.to_string()))?;
        let address = AccountId(address_bytes.try_into().map_err(|_| {
            StateError::InvalidValue("fingerprint index holds a malformed address".into())
        })?);
        self.get_recipient_key(state, &address, fingerprint)
    }

    /// Resolves a recipient key id (bare fingerprint or `<fp>:v<n>`) to a
    /// key owned by `address`. The version index is consulted when a version
    /// suffix is present, falling back to the fingerprint lookup.
    pub fn resolve_recipient_key_id(
        &self,
        state: &dyn StateAccess,
        address: &AccountId,
        key_id: &str,
    ) -> Result<RecipientKey, EncryptionError> {
        let (fingerprint, version) = split_recipient_key_id(key_id);
        if let Some(version) = version {
            if let Some(indexed) = state.get(&keys::version_index_key(address, version))? {
                let indexed_fp = String::from_utf8(indexed).map_err(|_| {
                    StateError::InvalidValue("version index is not valid UTF-8".into())
                })?;
                return self.get_recipient_key(state, address, &indexed_fp);
            }
        }
        self.get_recipient_key(state, address, fingerprint)
    }

    /// Validates a set of envelope recipient ids against the registry.
    ///
    /// Returns the fingerprints that are simply unknown (callers may accept
    /// envelopes for recipients that have never registered) but fails hard
    /// when a known recipient's key is revoked, deprecated or expired.
    pub fn validate_envelope_recipients(
        &self,
        state: &dyn StateAccess,
        recipient_key_ids: &[String],
        now: u64,
    ) -> Result<Vec<String>, EncryptionError> {
        let mut unknown = Vec::new();
        for id in recipient_key_ids {
            let (fingerprint, _) = split_recipient_key_id(id);
            match self.get_recipient_key_by_fingerprint(state, fingerprint) {
                Err(EncryptionError::KeyNotFound(_)) => unknown.push(fingerprint.to_string()),
                Err(e) => return Err(e),
                Ok(key) => {
                    if key.revoked_at != 0 {
                        return Err(EncryptionError::KeyRevoked(fingerprint.to_string()));
                    }
                    if key.deprecated_at != 0 {
                        return Err(EncryptionError::KeyDeprecated(fingerprint.to_string()));
                    }
                    if key.expires_at != 0 && now >= key.expires_at {
                        return Err(EncryptionError::KeyExpired(fingerprint.to_string()));
                    }
                }
            }
        }
        Ok(unknown)
    }

    // --- internal helpers ---

    pub(crate) fn save_recipient_key(
        &self,
        state: &mut dyn StateAccess,
        key: &RecipientKey,
    ) -> Result<(), EncryptionError> {
        let bytes = codec::to_bytes_canonical(key).map_err(StateError::InvalidValue)?;
        state.insert(&keys::recipient_key_key(&key.address, &key.fingerprint), &bytes)?;
        Ok(())
    }

    /// Returns all of an account's keys in fingerprint order.
    pub(crate) fn scan_account_keys(
        &self,
        state: &dyn StateAccess,
        address: &AccountId,
    ) -> Result<Vec<RecipientKey>, EncryptionError> {
        let prefix = keys::recipient_key_account_prefix(address);
        let mut out = Vec::new();
        for entry in state.prefix_scan(&prefix)? {
            let (_, value) = entry?;
            out.push(
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?,
            );
        }
        Ok(out)
    }

    /// The usable key with the highest version, if the account has one.
    pub(crate) fn latest_usable_key(
        &self,
        state: &dyn StateAccess,
        address: &AccountId,
        now: u64,
    ) -> Result<Option<RecipientKey>, EncryptionError> {
        Ok(self
            .scan_account_keys(state, address)?
            .into_iter()
            .filter(|k| k.is_usable(now))
            .max_by_key(|k| k.version))
    }

    /// If the active pointer references `fingerprint`, repoint it at the
    /// highest-version usable key, or clear it when none remains.
    pub(crate) fn recompute_active_if_pointing(
        &self,
        state: &mut dyn StateAccess,
        address: &AccountId,
        fingerprint: &str,
        now: u64,
    ) -> Result<(), EncryptionError> {
        let pointer_key = keys::active_key_key(address);
        let points_here = state
            .get(&pointer_key)?
            .map_or(false, |p| p == fingerprint.as_bytes());
        if !points_here {
            return Ok(());
        }
        match self.latest_usable_key(state, address, now)? {
            Some(replacement) => {
                state.insert(&pointer_key, replacement.fingerprint.as_bytes())?;
            }
            None => {
                state.delete(&pointer_key)?;
            }
        }
        Ok(())
    }
}
