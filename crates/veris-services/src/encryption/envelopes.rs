// Path: crates/veris-services/src/encryption/envelopes.rs
//! Content-addressed envelope storage and access checks.

use veris_api::state::StateAccess;
use veris_types::app::{split_recipient_key_id, AccountId, Envelope, EnvelopeRecord};
use veris_types::codec;
use veris_types::error::{EncryptionError, StateError};
use veris_types::keys;
use veris_types::MAX_ENVELOPE_CIPHERTEXT_BYTES;

use super::EncryptionModule;

impl EncryptionModule {
    /// Validates and stores an envelope, returning its content address.
    ///
    /// Storage is content-addressed by the envelope hash: storing the same
    /// envelope twice is a no-op that returns the existing address.
    pub fn store_envelope(
        &self,
        state: &mut dyn StateAccess,
        envelope: &Envelope,
        now: u64,
    ) -> Result<String, EncryptionError> {
        let params = self.params(state)?;
        envelope.validate(&params)?;
        if envelope.ciphertext.len() > MAX_ENVELOPE_CIPHERTEXT_BYTES {
            return Err(EncryptionError::InvalidEnvelope(format!(
                "ciphertext exceeds the {} byte cap",
                MAX_ENVELOPE_CIPHERTEXT_BYTES
            )));
        }
        if !envelope.sender_signature.is_empty() {
            let payload = envelope.signing_payload()?;
            self.primitives()
                .verify(&envelope.sender_pub_key, &payload, &envelope.sender_signature)?;
        }

        let hash = envelope.hash()?;
        let store_key = keys::envelope_record_key(&hash);
        if state.get(&store_key)?.is_some() {
            return Ok(hash);
        }

        let record = EnvelopeRecord {
            envelope: envelope.clone(),
            created_at: now,
            updated_at: now,
            rotation_count: 0,
        };
        let bytes = codec::to_bytes_canonical(&record).map_err(StateError::InvalidValue)?;
        state.insert(&store_key, &bytes)?;
        Ok(hash)
    }

    /// Loads an envelope record by its content address.
    pub fn get_envelope(
        &self,
        state: &dyn StateAccess,
        envelope_hash: &str,
    ) -> Result<EnvelopeRecord, EncryptionError> {
        let bytes = state
            .get(&keys::envelope_record_key(envelope_hash))?
            .ok_or_else(|| EncryptionError::KeyNotFound(format!(
                "envelope {} not found",
                envelope_hash
            )))?;
        codec::from_bytes_canonical(&bytes).map_err(|e| StateError::Decode(e).into())
    }

    /// Checks that `requester` may access `envelope`: some usable key the
    /// requester owns must be among the envelope's recipients.
    pub fn check_envelope_access(
        &self,
        state: &dyn StateAccess,
        envelope: &Envelope,
        requester: &AccountId,
        now: u64,
    ) -> Result<(), EncryptionError> {
        let owned = self.scan_account_keys(state, requester)?;
        let allowed = owned
            .iter()
            .filter(|key| key.is_usable(now))
            .any(|key| envelope.has_recipient(&key.fingerprint));
        if allowed {
            Ok(())
        } else {
            Err(EncryptionError::UnauthorizedAccess(format!(
                "account {} holds no usable recipient key for this envelope",
                requester
            )))
        }
    }

    /// Checks that `fingerprint` may open `envelope`: the fingerprint must be
    /// a recipient, and the key behind it must exist, be unrevoked, and not
    /// be expired.
    pub fn check_envelope_access_by_fingerprint(
        &self,
        state: &dyn StateAccess,
        envelope: &Envelope,
        fingerprint: &str,
        now: u64,
    ) -> Result<(), EncryptionError> {
        let (fingerprint, _) = split_recipient_key_id(fingerprint);
        if !envelope.has_recipient(fingerprint) {
            return Err(EncryptionError::NotRecipient(fingerprint.to_string()));
        }
        let key = self
            .get_recipient_key_by_fingerprint(state, fingerprint)
            .map_err(|_| {
                EncryptionError::UnauthorizedAccess(format!(
                    "recipient key {} does not exist",
                    fingerprint
                ))
            })?;
        if key.revoked_at != 0 {
            return Err(EncryptionError::UnauthorizedAccess(format!(
                "recipient key {} is revoked",
                fingerprint
            )));
        }
        if key.expires_at != 0 && now >= key.expires_at {
            return Err(EncryptionError::UnauthorizedAccess(format!(
                "recipient key {} is expired",
                fingerprint
            )));
        }
        Ok(())
    }

    /// Enforces that a domain message's payload field actually carries an
    /// encrypted envelope.
    pub fn enforce_encrypted_payload_required(
        &self,
        envelope: Option<&Envelope>,
        field_name: &str,
    ) -> Result<(), EncryptionError> {
        let envelope = envelope.ok_or_else(|| {
            EncryptionError::InvalidEnvelope(format!("{} requires an encrypted payload", field_name))
        })?;
        if envelope.ciphertext.is_empty() {
            return Err(EncryptionError::InvalidEnvelope(format!(
                "{} has an empty ciphertext",
                field_name
            )));
        }
        if envelope.recipient_key_ids.is_empty() {
            return Err(EncryptionError::InvalidEnvelope(format!(
                "{} names no recipients",
                field_name
            )));
        }
        Ok(())
    }
}
