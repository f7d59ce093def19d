// Path: crates/veris-services/src/lib.rs
//! Service modules for the Veris kernel.

pub mod encryption;

pub use encryption::EncryptionModule;
