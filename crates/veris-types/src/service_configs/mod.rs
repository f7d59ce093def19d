// Path: crates/veris-types/src/service_configs/mod.rs
//! Configuration structures for the encryption module.

use crate::app::AccountId;
use crate::error::EncryptionError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// On-chain parameters governing the encryption module.
///
/// Loaded from state on every mutating entry point; the stored copy lives
/// under the module's params key and is written at genesis or by governance.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, PartialEq, Eq)]
pub struct EncryptionParams {
    /// Maximum number of recipients a single envelope may address.
    pub max_recipients_per_envelope: u32,
    /// Maximum number of recipient keys an account may hold at once.
    pub max_keys_per_account: u32,
    /// Algorithm ids allowed for new envelopes; empty means every supported
    /// algorithm is allowed.
    pub allowed_algorithms: Vec<String>,
    /// Whether envelopes must carry a sender signature.
    pub require_signature: bool,
    /// Grace period between revocation and purge eligibility, in seconds;
    /// 0 disables purging.
    pub revocation_grace_period_seconds: u64,
    /// Expiry warning windows, in seconds before expiry, largest first.
    pub key_expiry_warning_seconds: Vec<u64>,
    /// Maximum number of re-encryption jobs queued or processed per call.
    pub rotation_batch_size: u32,
    /// Default TTL applied to newly registered keys; 0 means no expiry.
    pub default_key_ttl_seconds: u64,
}

impl Default for EncryptionParams {
    fn default() -> Self {
        Self {
            max_recipients_per_envelope: 16,
            max_keys_per_account: 10,
            allowed_algorithms: Vec::new(),
            require_signature: false,
            revocation_grace_period_seconds: 604800, // 7 days
            key_expiry_warning_seconds: vec![604800, 86400], // 7 days, 1 day
            rotation_batch_size: 50,
            default_key_ttl_seconds: 0,
        }
    }
}

impl EncryptionParams {
    /// Validates the positivity invariants a genesis file must satisfy.
    pub fn validate(&self) -> Result<(), EncryptionError> {
        if self.max_recipients_per_envelope == 0 {
            return Err(EncryptionError::CryptoAgility(
                "max_recipients_per_envelope must be positive".into(),
            ));
        }
        if self.max_keys_per_account == 0 {
            return Err(EncryptionError::CryptoAgility(
                "max_keys_per_account must be positive".into(),
            ));
        }
        if self.rotation_batch_size == 0 {
            return Err(EncryptionError::CryptoAgility(
                "rotation_batch_size must be positive".into(),
            ));
        }
        for id in &self.allowed_algorithms {
            if !crate::app::algorithm::is_supported(id) {
                return Err(EncryptionError::AlgorithmNotFound(id.clone()));
            }
        }
        Ok(())
    }
}

bitflags::bitflags! {
    /// A bitmask representing the lifecycle hooks a service exposes.
    /// This is distinct from the service's callable methods, which are defined in its ABI.
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[serde(transparent)]
    pub struct Capabilities: u32 {
        /// Implements the OnEndBlock trait and its `on_end_block` hook.
        const ON_END_BLOCK = 0b0001;
    }
}

impl Encode for Capabilities {
    fn encode_to<T: parity_scale_codec::Output + ?Sized>(&self, dest: &mut T) {
        self.bits().encode_to(dest)
    }
}

impl Decode for Capabilities {
    fn decode<I: parity_scale_codec::Input>(
        input: &mut I,
    ) -> Result<Self, parity_scale_codec::Error> {
        let bits = u32::decode(input)?;
        Self::from_bits(bits).ok_or_else(|| "Invalid bits for Capabilities".into())
    }
}

/// Defines the on-chain authority for privileged actions such as revoking
/// another account's key.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub enum GovernanceSigner {
    /// A single account is the authority.
    Single(AccountId),
    /* Future extension point
    MultiSig { threshold: u8, members: Vec<AccountId> },
    */
}

impl GovernanceSigner {
    /// Whether `account` is the configured authority.
    pub fn is_authority(&self, account: &AccountId) -> bool {
        match self {
            GovernanceSigner::Single(authority) => authority == account,
        }
    }
}
