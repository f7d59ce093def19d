// Path: crates/veris-types/src/app/algorithm.rs

//! The algorithm registry: the authoritative, closed catalog of envelope
//! encryption schemes and their lifecycle status.
//!
//! Instead of a runtime plugin surface, the catalog is a compile-time table.
//! The chain can still move from classical X25519 schemes toward hybrid or
//! post-quantum schemes by adding entries and advancing statuses, while
//! validation stays bit-for-bit deterministic across nodes.

use crate::error::EncryptionError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Canonical id of the classical X25519 + XSalsa20-Poly1305 scheme.
pub const ALG_X25519_XSALSA20_POLY1305: &str = "X25519-XSALSA20-POLY1305";
/// Canonical id of the hybrid X25519 + Kyber768 scheme.
pub const ALG_X25519_KYBER768_XSALSA20_POLY1305: &str = "X25519-KYBER768-XSALSA20-POLY1305";
/// Canonical id of the pure post-quantum Kyber768 scheme.
pub const ALG_KYBER768_XSALSA20_POLY1305: &str = "KYBER768-XSALSA20-POLY1305";

/// The broad cryptographic family an algorithm belongs to.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum AlgorithmFamily {
    /// Pre-quantum elliptic-curve schemes.
    Classical,
    /// Combined classical + post-quantum schemes; envelopes declare a
    /// secondary algorithm.
    Hybrid,
    /// Pure post-quantum schemes.
    PostQuantum,
}

/// Lifecycle status of an algorithm.
///
/// Statuses form a lattice: `Experimental` → `Approved` → `Recommended`, and
/// any status may move to `Deprecated` and then `Disabled`. Deprecated
/// algorithms must still decrypt historical envelopes; disabled algorithms
/// fail both directions.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum AlgorithmStatus {
    /// Available for evaluation; not yet allowed for new envelopes.
    Experimental,
    /// Allowed for new envelopes.
    Approved,
    /// The preferred default for new envelopes.
    Recommended,
    /// No longer allowed for new envelopes; still decryptable.
    Deprecated,
    /// Rejected for both encryption and decryption.
    Disabled,
}

/// Metadata describing one supported algorithm.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AlgorithmInfo {
    /// The canonical string id carried by envelopes and key records.
    pub id: &'static str,
    /// The registry's current version for this id. Envelopes must match it.
    pub version: u32,
    /// Public-key size in bytes.
    pub key_size: usize,
    /// AEAD nonce size in bytes.
    pub nonce_size: usize,
    /// AEAD authentication-tag size in bytes.
    pub tag_size: usize,
    /// The family this algorithm belongs to.
    pub family: AlgorithmFamily,
    /// The lifecycle status.
    pub status: AlgorithmStatus,
    /// The id encrypters should migrate to when this one is deprecated.
    pub successor: Option<&'static str>,
    /// For hybrid schemes, the classical component's id.
    pub secondary: Option<&'static str>,
}

impl AlgorithmInfo {
    /// Whether new envelopes may be sealed with this algorithm.
    pub fn is_usable(&self) -> bool {
        matches!(
            self.status,
            AlgorithmStatus::Approved | AlgorithmStatus::Recommended
        )
    }

    /// Whether historical envelopes under this algorithm may still be opened.
    pub fn is_decryptable(&self) -> bool {
        self.status != AlgorithmStatus::Disabled
    }

    /// Whether this algorithm has been deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.status == AlgorithmStatus::Deprecated
    }
}

/// The compiled-in catalog. Adding an algorithm is a config-time operation;
/// entries are never removed, only disabled, so historical state stays
/// interpretable.
const SUPPORTED_ALGORITHMS: &[AlgorithmInfo] = &[
    AlgorithmInfo {
        id: ALG_X25519_XSALSA20_POLY1305,
        version: 1,
        key_size: 32,
        nonce_size: 24,
        tag_size: 16,
        family: AlgorithmFamily::Classical,
        status: AlgorithmStatus::Recommended,
        successor: Some(ALG_X25519_KYBER768_XSALSA20_POLY1305),
        secondary: None,
    },
    AlgorithmInfo {
        id: ALG_X25519_KYBER768_XSALSA20_POLY1305,
        version: 1,
        key_size: 1216, // 32-byte X25519 key + 1184-byte Kyber768 key
        nonce_size: 24,
        tag_size: 16,
        family: AlgorithmFamily::Hybrid,
        status: AlgorithmStatus::Experimental,
        successor: None,
        secondary: Some(ALG_X25519_XSALSA20_POLY1305),
    },
    AlgorithmInfo {
        id: ALG_KYBER768_XSALSA20_POLY1305,
        version: 1,
        key_size: 1184,
        nonce_size: 24,
        tag_size: 16,
        family: AlgorithmFamily::PostQuantum,
        status: AlgorithmStatus::Experimental,
        successor: None,
        secondary: None,
    },
];

/// Returns the full catalog of supported algorithms.
pub fn supported_algorithms() -> &'static [AlgorithmInfo] {
    SUPPORTED_ALGORITHMS
}

/// Looks up an algorithm's metadata by id.
pub fn get_info(id: &str) -> Option<&'static AlgorithmInfo> {
    SUPPORTED_ALGORITHMS.iter().find(|a| a.id == id)
}

/// Whether the registry knows this id at all.
pub fn is_supported(id: &str) -> bool {
    get_info(id).is_some()
}

/// The default algorithm for new envelopes: the first `Recommended` entry.
pub fn default_algorithm() -> &'static AlgorithmInfo {
    SUPPORTED_ALGORITHMS
        .iter()
        .find(|a| a.status == AlgorithmStatus::Recommended)
        .unwrap_or(&SUPPORTED_ALGORITHMS[0])
}

/// Validates that a public key and nonce match the declared sizes for `id`.
///
/// Unknown ids are rejected with `UnsupportedAlgorithm`; size mismatches with
/// `InvalidEnvelope`.
pub fn validate_params(id: &str, public_key: &[u8], nonce: &[u8]) -> Result<(), EncryptionError> {
    let info =
        get_info(id).ok_or_else(|| EncryptionError::UnsupportedAlgorithm(id.to_string()))?;
    if public_key.len() != info.key_size {
        return Err(EncryptionError::InvalidEnvelope(format!(
            "public key size {} does not match algorithm {} (expected {})",
            public_key.len(),
            id,
            info.key_size
        )));
    }
    if nonce.len() != info.nonce_size {
        return Err(EncryptionError::InvalidEnvelope(format!(
            "nonce size {} does not match algorithm {} (expected {})",
            nonce.len(),
            id,
            info.nonce_size
        )));
    }
    Ok(())
}
