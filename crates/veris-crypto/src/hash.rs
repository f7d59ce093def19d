// Path: crates/veris-crypto/src/hash.rs
//! Cryptographic hash functions using dcrypt

use crate::error::EncryptionError;
use dcrypt::algorithms::hash::sha2::Sha256 as DcryptSha256;
use dcrypt::algorithms::hash::HashFunction as DcryptHashFunction;
use dcrypt::algorithms::ByteSerializable;

/// Create a SHA-256 hash of any type that can be referenced as bytes
pub fn sha256<T: AsRef<[u8]>>(data: T) -> Result<[u8; 32], EncryptionError> {
    // Use dcrypt's SHA-256 implementation.
    // Explicitly map the specific algorithm error to the general `dcrypt::Error`
    // to resolve the ambiguity for the `?` operator.
    let digest = DcryptSha256::digest(data.as_ref())
        .map_err(dcrypt::Error::from)
        .map_err(|e| EncryptionError::EncryptionFailed(format!("sha256 failed: {}", e)))?;
    digest
        .to_bytes()
        .try_into()
        .map_err(|bytes: Vec<u8>| {
            EncryptionError::EncryptionFailed(format!(
                "sha256 digest length {} (expected 32)",
                bytes.len()
            ))
        })
}
