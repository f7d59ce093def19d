// Path: crates/veris-types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Veris Encryption Core Types
//!
//! This crate is the foundational library for the Veris encryption core,
//! containing all core data structures, error types, and configuration
//! objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `veris-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. This structure prevents
//! circular dependencies and provides a stable, canonical definition for
//! shared types like `Envelope`, `RecipientKey`, `AccountId`, and the error
//! enums.

/// The maximum size in bytes for a stored envelope ciphertext.
pub const MAX_ENVELOPE_CIPHERTEXT_BYTES: usize = 256 * 1024; // 256 KiB

/// Core application-level data structures like `Envelope` and `RecipientKey`.
pub mod app;
/// The canonical, deterministic binary codec for consensus-critical state.
pub mod codec;
/// A unified set of all error types used across the core.
pub mod error;
/// Constants for well-known state keys used for accessing data in the state manager.
pub mod keys;
/// Configuration structures for the encryption module.
pub mod service_configs;
