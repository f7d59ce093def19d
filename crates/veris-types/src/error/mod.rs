// Path: crates/veris-types/src/error/mod.rs
//! Core error types for the Veris encryption core.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors related to the state tree or state manager.
#[derive(Error, Debug)]
pub enum StateError {
    /// The requested key was not found in the state.
    #[error("Key not found in state")]
    KeyNotFound,
    /// An error occurred in the state backend.
    #[error("State backend error: {0}")]
    Backend(String),
    /// An error occurred while writing to the state.
    #[error("State write error: {0}")]
    WriteError(String),
    /// The provided value was invalid.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// An error occurred during state deserialization.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "STATE_KEY_NOT_FOUND",
            Self::Backend(_) => "STATE_BACKEND_ERROR",
            Self::WriteError(_) => "STATE_WRITE_ERROR",
            Self::InvalidValue(_) => "STATE_INVALID_VALUE",
            Self::Decode(_) => "STATE_DECODE_ERROR",
        }
    }
}

/// Errors produced by the encryption module: key registry, envelope codec,
/// rotation engine, ephemeral session keys and access checks.
///
/// Every variant carries a stable code via [`ErrorCode`] so the host can map
/// kinds to response codes without parsing messages.
#[derive(Error, Debug)]
pub enum EncryptionError {
    /// The account address is malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// The public key is malformed, has the wrong size, or cannot be accepted.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    /// The key fingerprint is malformed.
    #[error("Invalid key fingerprint: {0}")]
    InvalidKeyFingerprint(String),
    /// The nonce is malformed or has the wrong size.
    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),
    /// The requested key does not exist.
    #[error("Key not found: {0}")]
    KeyNotFound(String),
    /// A key with the same fingerprint is already registered.
    #[error("Key already exists: {0}")]
    KeyAlreadyExists(String),
    /// The key has been revoked.
    #[error("Key {0} is revoked")]
    KeyRevoked(String),
    /// The key has been deprecated by a rotation.
    #[error("Key {0} is deprecated")]
    KeyDeprecated(String),
    /// The key is past its expiration time.
    #[error("Key {0} is expired")]
    KeyExpired(String),
    /// The envelope failed structural validation.
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),
    /// The algorithm is not in the registry or not allowed by policy.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// The envelope format version is newer than this node supports.
    #[error("Unsupported envelope version {got} (max supported {max})")]
    UnsupportedVersion {
        /// The maximum format version this build understands.
        max: u32,
        /// The version carried by the envelope.
        got: u32,
    },
    /// The sender signature failed verification.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    /// A sealing operation failed in the primitives provider.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    /// An opening operation failed in the primitives provider.
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    /// The caller is not permitted to perform this operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The requester is not allowed to access this envelope.
    #[error("Unauthorized access: {0}")]
    UnauthorizedAccess(String),
    /// The key is not among the envelope's recipients.
    #[error("Not a recipient: {0}")]
    NotRecipient(String),
    /// The envelope addresses more recipients than policy allows.
    #[error("Too many recipients: {got} exceeds the maximum of {max}")]
    MaxRecipientsExceeded {
        /// The policy maximum.
        max: u32,
        /// The number of recipients in the envelope.
        got: u32,
    },
    /// A cryptographic-agility policy was violated.
    #[error("Crypto agility policy violation: {0}")]
    CryptoAgility(String),
    /// The algorithm id is unknown to the registry.
    #[error("Algorithm not found: {0}")]
    AlgorithmNotFound(String),
    /// The algorithm is deprecated and may no longer encrypt.
    #[error("Algorithm {0} is deprecated")]
    AlgorithmDeprecated(String),
    /// The algorithm is disabled for both encryption and decryption.
    #[error("Algorithm {0} is disabled")]
    AlgorithmDisabled(String),
    /// A rotation campaign is already running for this key.
    #[error("Key rotation already in progress: {0}")]
    KeyRotationInProgress(String),
    /// No rotation campaign exists under this id.
    #[error("Key rotation not found: {0}")]
    KeyRotationNotFound(String),
    /// A rotation campaign could not be completed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
    /// A re-encryption job failed permanently.
    #[error("Re-encryption job failed: {0}")]
    ReencryptionJobFailed(String),
    /// An error originating from the state manager.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl ErrorCode for EncryptionError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "ENC_INVALID_ADDRESS",
            Self::InvalidPublicKey(_) => "ENC_INVALID_PUBLIC_KEY",
            Self::InvalidKeyFingerprint(_) => "ENC_INVALID_KEY_FINGERPRINT",
            Self::InvalidNonce(_) => "ENC_INVALID_NONCE",
            Self::KeyNotFound(_) => "ENC_KEY_NOT_FOUND",
            Self::KeyAlreadyExists(_) => "ENC_KEY_ALREADY_EXISTS",
            Self::KeyRevoked(_) => "ENC_KEY_REVOKED",
            Self::KeyDeprecated(_) => "ENC_KEY_DEPRECATED",
            Self::KeyExpired(_) => "ENC_KEY_EXPIRED",
            Self::InvalidEnvelope(_) => "ENC_INVALID_ENVELOPE",
            Self::UnsupportedAlgorithm(_) => "ENC_UNSUPPORTED_ALGORITHM",
            Self::UnsupportedVersion { .. } => "ENC_UNSUPPORTED_VERSION",
            Self::InvalidSignature(_) => "ENC_INVALID_SIGNATURE",
            Self::EncryptionFailed(_) => "ENC_ENCRYPTION_FAILED",
            Self::DecryptionFailed(_) => "ENC_DECRYPTION_FAILED",
            Self::Unauthorized(_) => "ENC_UNAUTHORIZED",
            Self::UnauthorizedAccess(_) => "ENC_UNAUTHORIZED_ACCESS",
            Self::NotRecipient(_) => "ENC_NOT_RECIPIENT",
            Self::MaxRecipientsExceeded { .. } => "ENC_MAX_RECIPIENTS_EXCEEDED",
            Self::CryptoAgility(_) => "ENC_CRYPTO_AGILITY",
            Self::AlgorithmNotFound(_) => "ENC_ALGORITHM_NOT_FOUND",
            Self::AlgorithmDeprecated(_) => "ENC_ALGORITHM_DEPRECATED",
            Self::AlgorithmDisabled(_) => "ENC_ALGORITHM_DISABLED",
            Self::KeyRotationInProgress(_) => "ENC_KEY_ROTATION_IN_PROGRESS",
            Self::KeyRotationNotFound(_) => "ENC_KEY_ROTATION_NOT_FOUND",
            Self::MigrationFailed(_) => "ENC_MIGRATION_FAILED",
            Self::ReencryptionJobFailed(_) => "ENC_REENCRYPTION_JOB_FAILED",
            Self::State(e) => e.code(),
        }
    }
}

/// Errors related to transaction-level dispatch into the module.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// An error occurred during serialization.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error occurred during deserialization.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// The transaction is invalid for a module-specific reason.
    #[error("Invalid transaction: {0}")]
    Invalid(String),
    /// An error originating from the encryption module.
    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),
    /// An error originating from the state manager.
    #[error("State error: {0}")]
    State(#[from] StateError),
    /// The called method is not exposed by this service.
    #[error("Unsupported call: {0}")]
    Unsupported(String),
}

impl ErrorCode for TransactionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "TX_SERIALIZATION_FAILED",
            Self::Deserialization(_) => "TX_DESERIALIZATION_FAILED",
            Self::Invalid(_) => "TX_INVALID",
            Self::Encryption(e) => e.code(),
            Self::State(e) => e.code(),
            Self::Unsupported(_) => "TX_UNSUPPORTED",
        }
    }
}

/// Errors raised by the host event emitter. Emission failures are non-fatal
/// to the state transition that produced the event.
#[derive(Error, Debug)]
pub enum EventError {
    /// The host could not accept the event.
    #[error("Event emission failed: {0}")]
    Emit(String),
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::Emit(_) => "EVENT_EMIT_FAILED",
        }
    }
}
