// Path: crates/veris-api/src/lib.rs

//! # Veris API Crate Lints
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
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
//! # Veris Encryption Core API
//!
//! Core traits and interfaces for the Veris encryption core. This crate
//! defines the stable contract between the consensus host, the cryptographic
//! primitives provider, and the encryption module: the module mutates state
//! only through [`state::StateAccess`], performs primitive operations only
//! through [`crypto::EnvelopePrimitives`], and reports lifecycle changes
//! through [`events::EventEmitter`] and [`hooks::EncryptionHooks`].

/// Defines the primitives port and the re-encryption worker port.
pub mod crypto;
/// Re-exports all core error types from the central `veris-types` crate.
pub mod error;
/// The typed-event emission port provided by the host.
pub mod events;
/// Optional lifecycle callbacks observed by other modules.
pub mod hooks;
/// Defines traits for services that hook into the block processing lifecycle.
pub mod lifecycle;
/// Traits for pluggable blockchain services.
pub mod services;
/// Core traits for state management, including `StateAccess`.
pub mod state;
/// Defines the stable context for transaction execution.
pub mod transaction;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::crypto::{EnvelopePrimitives, ReencryptionWorker};
    pub use crate::events::EventEmitter;
    pub use crate::hooks::EncryptionHooks;
    pub use crate::lifecycle::OnEndBlock;
    pub use crate::services::BlockchainService;
    pub use crate::state::{StateAccess, StateKVPair, StateScanIter};
    pub use crate::transaction::context::TxContext;
}
