// Path: crates/veris-api/src/events/mod.rs
//! The typed-event emission port provided by the host.

use veris_types::app::EncryptionEvent;
use veris_types::error::EventError;

/// A sink for typed lifecycle events, implemented by the host.
///
/// Emission happens after the state transition that produced the event has
/// already been applied to the transactional store, so an emission failure is
/// never a reason to abort: callers log the error and continue. Events are
/// emitted in the order of their state transitions within a call.
pub trait EventEmitter: Send + Sync {
    /// Delivers one typed event to the host.
    fn emit(&self, event: EncryptionEvent) -> Result<(), EventError>;
}

/// An emitter that drops every event. Useful for hosts without indexing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
    fn emit(&self, _event: EncryptionEvent) -> Result<(), EventError> {
        Ok(())
    }
}
