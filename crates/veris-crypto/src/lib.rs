// Path: crates/veris-crypto/src/lib.rs
//! # Veris Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # Veris Encryption Core Cryptography
//!
//! The default implementation of the encryption core's primitives port:
//! X25519 Diffie-Hellman, XSalsa20-Poly1305 sealing, SHA-256, and Ed25519
//! sender signatures. Also home to the operator-side re-encryption worker
//! used by rotation campaigns.

pub mod error;
pub mod hash;
pub mod primitives;
pub mod reencryptor;

pub use primitives::NaclPrimitives;
pub use reencryptor::LocalKeyReencryptor;
