// Path: crates/veris-crypto/src/error.rs
//! Local error types for the `veris-crypto` crate.

// Re-export the canonical error type from the API crate.
pub use veris_api::error::EncryptionError;
