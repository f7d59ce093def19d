// Path: crates/veris-api/src/error.rs
//! Re-exports the canonical error types from the central `veris-types` crate.

pub use veris_types::error::{
    EncryptionError, ErrorCode, EventError, StateError, TransactionError,
};
