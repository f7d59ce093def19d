// Path: crates/veris-test-utils/src/emitters.rs
//! Capturing event and hook implementations for assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use veris_api::events::EventEmitter;
use veris_api::hooks::EncryptionHooks;
use veris_types::app::{AccountId, EncryptionEvent, RecipientKey};
use veris_types::error::EventError;

/// An emitter that records every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<EncryptionEvent>>,
}

impl RecordingEmitter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of all recorded events, in emission order.
    pub fn events(&self) -> Vec<EncryptionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: EncryptionEvent) -> Result<(), EventError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        Ok(())
    }
}

/// An emitter that rejects every event, for exercising the non-fatal
/// emission contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingEmitter;

impl EventEmitter for FailingEmitter {
    fn emit(&self, _event: EncryptionEvent) -> Result<(), EventError> {
        Err(EventError::Emit("test emitter always fails".into()))
    }
}

/// Hooks that count their invocations.
#[derive(Debug, Default)]
pub struct CountingHooks {
    /// Number of `after_key_revoked` calls.
    pub revoked: AtomicUsize,
    /// Number of `after_key_rotated` calls.
    pub rotated: AtomicUsize,
    /// Number of `after_key_expired` calls.
    pub expired: AtomicUsize,
}

impl CountingHooks {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EncryptionHooks for CountingHooks {
    fn after_key_revoked(&self, _address: &AccountId, _key: &RecipientKey) -> Result<(), String> {
        self.revoked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn after_key_rotated(
        &self,
        _address: &AccountId,
        _old_fingerprint: &str,
        _new_fingerprint: &str,
    ) -> Result<(), String> {
        self.rotated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn after_key_expired(&self, _address: &AccountId, _key: &RecipientKey) -> Result<(), String> {
        self.expired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
