// Path: crates/veris-api/src/hooks/mod.rs
//! Optional lifecycle callbacks observed by other modules.

use veris_types::app::{AccountId, RecipientKey};

/// Callbacks other modules may register to observe key lifecycle transitions.
///
/// Hook errors are ignored by the encryption core: the state transition has
/// already happened, and a misbehaving observer must not be able to stall key
/// lifecycle management. All default implementations are no-ops.
pub trait EncryptionHooks: Send + Sync {
    /// Called after a key has been revoked.
    fn after_key_revoked(&self, address: &AccountId, key: &RecipientKey) -> Result<(), String> {
        let _ = (address, key);
        Ok(())
    }

    /// Called after a rotation campaign has been initiated.
    fn after_key_rotated(
        &self,
        address: &AccountId,
        old_fingerprint: &str,
        new_fingerprint: &str,
    ) -> Result<(), String> {
        let _ = (address, old_fingerprint, new_fingerprint);
        Ok(())
    }

    /// Called after the sweeper has expired a key.
    fn after_key_expired(&self, address: &AccountId, key: &RecipientKey) -> Result<(), String> {
        let _ = (address, key);
        Ok(())
    }
}

/// A hooks implementation that observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl EncryptionHooks for NoopHooks {}
