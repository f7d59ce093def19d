// Path: crates/veris-test-utils/src/lib.rs

//! # Veris Test Utilities
//!
//! Utilities for testing the Veris encryption core: an in-memory
//! `StateAccess`, capturing event and hook implementations, and
//! deterministic key and envelope fixtures.

pub mod emitters;
pub mod fixtures;
pub mod state;

pub use emitters::{CountingHooks, FailingEmitter, RecordingEmitter};
pub use fixtures::{fixture_keypair, open_envelope, seal_envelope, test_ctx, FixtureKeyPair};
pub use state::MemoryState;
