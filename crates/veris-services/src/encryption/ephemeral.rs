// Path: crates/veris-services/src/encryption/ephemeral.rs
//! Short-lived, single-use session keys.
//!
//! An ephemeral key is generated through the primitives port, bound to an
//! account and the creating block's height, and handed to the caller exactly
//! once. The chain stores only the public half; the session id is
//! deterministic so the caller can re-derive it from what they already know.

use veris_api::state::StateAccess;
use veris_types::app::{AccountId, EphemeralKey};
use veris_types::codec;
use veris_types::error::{EncryptionError, StateError};
use veris_types::keys;
use zeroize::Zeroizing;

use super::EncryptionModule;

impl EncryptionModule {
    /// Creates an ephemeral session key for `address`.
    ///
    /// Returns `(session_id, public_key, private_key)`; the private key is
    /// returned to the caller once and never persisted.
    pub fn create_ephemeral_key(
        &self,
        state: &mut dyn StateAccess,
        address: &AccountId,
        ttl_seconds: u64,
        now: u64,
        height: u64,
    ) -> Result<(String, Vec<u8>, Zeroizing<Vec<u8>>), EncryptionError> {
        let pair = self.primitives().generate_keypair()?;

        let mut preimage = Vec::new();
        preimage.extend_from_slice(address.to_canonical_string().as_bytes());
        preimage.extend_from_slice(&pair.public_key);
        preimage.extend_from_slice(&(height as i64).to_be_bytes());
        let session_id = hex::encode(self.primitives().sha256(&preimage)?);

        let record = EphemeralKey {
            session_id: session_id.clone(),
            address: *address,
            public_key: pair.public_key.clone(),
            created_at: now,
            expires_at: if ttl_seconds > 0 { now + ttl_seconds } else { 0 },
            used_at: 0,
        };
        let bytes = codec::to_bytes_canonical(&record).map_err(StateError::InvalidValue)?;
        state.insert(&keys::ephemeral_key_key(&session_id), &bytes)?;

        Ok((session_id, pair.public_key, pair.private_key))
    }

    /// Consumes one use of an ephemeral session key.
    ///
    /// Fails with `KeyNotFound` when the session is unknown, `KeyExpired`
    /// when its TTL has lapsed, and `KeyRevoked` when it was already used.
    pub fn use_ephemeral_key(
        &self,
        state: &mut dyn StateAccess,
        session_id: &str,
        now: u64,
    ) -> Result<(), EncryptionError> {
        let store_key = keys::ephemeral_key_key(session_id);
        let bytes = state
            .get(&store_key)?
            .ok_or_else(|| EncryptionError::KeyNotFound(session_id.to_string()))?;
        let mut record: EphemeralKey =
            codec::from_bytes_canonical(&bytes).map_err(StateError::Decode)?;

        if record.expires_at != 0 && now >= record.expires_at {
            return Err(EncryptionError::KeyExpired(session_id.to_string()));
        }
        if record.used_at != 0 {
            return Err(EncryptionError::KeyRevoked(format!(
                "session {} was already used",
                session_id
            )));
        }

        record.used_at = now;
        let bytes = codec::to_bytes_canonical(&record).map_err(StateError::InvalidValue)?;
        state.insert(&store_key, &bytes)?;
        Ok(())
    }

    /// Deletes used and expired session keys. Returns the number removed.
    pub fn cleanup_ephemeral_keys(
        &self,
        state: &mut dyn StateAccess,
        now: u64,
    ) -> Result<u64, EncryptionError> {
        let mut stale: Vec<String> = Vec::new();
        for entry in state.prefix_scan(keys::EPHEMERAL_KEY_PREFIX)? {
            let (_, value) = entry?;
            let record: EphemeralKey =
                codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
            let expired = record.expires_at != 0 && now >= record.expires_at;
            if record.used_at != 0 || expired {
                stale.push(record.session_id);
            }
        }
        let removed = stale.len() as u64;
        for session_id in stale {
            state.delete(&keys::ephemeral_key_key(&session_id))?;
        }
        Ok(removed)
    }

    /// Derives the Diffie-Hellman shared secret between an ephemeral private
    /// key and a peer's public key, through the primitives port.
    pub fn derive_shared_secret(
        &self,
        ephemeral_private_key: &[u8],
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
        self.primitives()
            .dh_shared_secret(ephemeral_private_key, peer_public_key)
    }
}
