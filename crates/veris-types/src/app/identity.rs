// Path: crates/veris-types/src/app/identity.rs

//! Defines the canonical `AccountId` used to address recipient-key registries
//! and envelope access checks.
//!
//! This module serves as the foundational source of truth for on-chain
//! identity within the encryption core, ensuring consistency across the key
//! registry, the envelope store, and event emission.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A unique identifier for a blockchain, used for replay protection.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
#[serde(transparent)] // Ensures JSON/TOML is just the raw u32
pub struct ChainId(pub u32);

impl From<u32> for ChainId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
impl From<ChainId> for u32 {
    fn from(c: ChainId) -> Self {
        c.0
    }
}

impl core::fmt::Display for ChainId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique, stable identifier for an on-chain account.
///
/// The `AccountId` remains constant even as the account's recipient keys are
/// rotated, providing a persistent address for key registries and envelope
/// recipients. It is represented as a 32-byte array; its canonical string
/// form is lowercase hex and is the form hashed into session ids and surfaced
/// in events.
#[derive(
    Encode,
    Decode,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    Hash,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Returns the canonical lowercase-hex string form of this account id.
    pub fn to_canonical_string(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for AccountId {
    /// Allows treating the `AccountId` as a byte slice.
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for AccountId {
    /// Allows creating an `AccountId` directly from a 32-byte array.
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
