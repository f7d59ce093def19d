// Path: crates/veris-crypto/src/primitives/mod.rs
//! The default primitives provider: X25519 + XSalsa20-Poly1305 + SHA-256 +
//! Ed25519.
//!
//! Every operation except key generation is a pure function of its inputs.
//! The provider performs no policy checks; size and membership validation
//! belongs to the envelope codec and the key registry.

use crate::error::EncryptionError;
use crate::hash;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use dcrypt::api::Signature as SignatureTrait;
use dcrypt::sign::eddsa::{
    Ed25519, Ed25519PublicKey, Ed25519SecretKey, Ed25519Signature,
};
use rand::rngs::OsRng;
use veris_api::crypto::{EnvelopePrimitives, GeneratedKeyPair};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// X25519 public and private keys are 32 bytes.
const X25519_KEY_LEN: usize = 32;
/// XSalsa20-Poly1305 secretbox keys are 32 bytes.
const SECRETBOX_KEY_LEN: usize = 32;
/// XSalsa20-Poly1305 nonces are 24 bytes.
const SECRETBOX_NONCE_LEN: usize = 24;
/// Ed25519 seeds are 32 bytes.
const ED25519_SEED_LEN: usize = 32;

/// The NaCl-box-style primitives provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaclPrimitives;

impl NaclPrimitives {
    /// Creates a new provider.
    pub fn new() -> Self {
        Self
    }
}

/// Derives the Ed25519 verify key for a 32-byte signing seed.
pub fn ed25519_public_from_seed(seed: &[u8; 32]) -> Result<Vec<u8>, EncryptionError> {
    let secret = Ed25519SecretKey::from_seed(seed).map_err(|e| {
        EncryptionError::InvalidSignature(format!("failed to load signing seed: {:?}", e))
    })?;
    let public = secret.public_key().map_err(|e| {
        EncryptionError::InvalidSignature(format!("failed to derive verify key: {:?}", e))
    })?;
    Ok(public.to_bytes().to_vec())
}

fn x25519_private(bytes: &[u8]) -> Result<StaticSecret, EncryptionError> {
    let arr: [u8; X25519_KEY_LEN] = bytes.try_into().map_err(|_| {
        EncryptionError::InvalidPublicKey(format!(
            "X25519 private key must be {} bytes, got {}",
            X25519_KEY_LEN,
            bytes.len()
        ))
    })?;
    Ok(StaticSecret::from(arr))
}

fn x25519_public(bytes: &[u8]) -> Result<X25519PublicKey, EncryptionError> {
    let arr: [u8; X25519_KEY_LEN] = bytes.try_into().map_err(|_| {
        EncryptionError::InvalidPublicKey(format!(
            "X25519 public key must be {} bytes, got {}",
            X25519_KEY_LEN,
            bytes.len()
        ))
    })?;
    Ok(X25519PublicKey::from(arr))
}

impl EnvelopePrimitives for NaclPrimitives {
    fn generate_keypair(&self) -> Result<GeneratedKeyPair, EncryptionError> {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Ok(GeneratedKeyPair {
            public_key: public.as_bytes().to_vec(),
            private_key: Zeroizing::new(secret.to_bytes().to_vec()),
        })
    }

    fn dh_shared_secret(
        &self,
        private_key: &[u8],
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
        let secret = x25519_private(private_key)?;
        let peer = x25519_public(peer_public_key)?;
        let shared = secret.diffie_hellman(&peer);
        Ok(Zeroizing::new(shared.as_bytes().to_vec()))
    }

    fn aead_seal(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, EncryptionError> {
        if key.len() != SECRETBOX_KEY_LEN {
            return Err(EncryptionError::EncryptionFailed(format!(
                "AEAD key must be {} bytes, got {}",
                SECRETBOX_KEY_LEN,
                key.len()
            )));
        }
        if nonce.len() != SECRETBOX_NONCE_LEN {
            return Err(EncryptionError::InvalidNonce(format!(
                "AEAD nonce must be {} bytes, got {}",
                SECRETBOX_NONCE_LEN,
                nonce.len()
            )));
        }
        let cipher = XSalsa20Poly1305::new_from_slice(key)
            .map_err(|e| EncryptionError::EncryptionFailed(format!("AEAD key setup: {}", e)))?;
        cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|e| EncryptionError::EncryptionFailed(format!("AEAD seal: {}", e)))
    }

    fn aead_open(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
        if key.len() != SECRETBOX_KEY_LEN {
            return Err(EncryptionError::DecryptionFailed(format!(
                "AEAD key must be {} bytes, got {}",
                SECRETBOX_KEY_LEN,
                key.len()
            )));
        }
        if nonce.len() != SECRETBOX_NONCE_LEN {
            return Err(EncryptionError::InvalidNonce(format!(
                "AEAD nonce must be {} bytes, got {}",
                SECRETBOX_NONCE_LEN,
                nonce.len()
            )));
        }
        let cipher = XSalsa20Poly1305::new_from_slice(key)
            .map_err(|e| EncryptionError::DecryptionFailed(format!("AEAD key setup: {}", e)))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                EncryptionError::DecryptionFailed("AEAD tag verification failed".into())
            })?;
        Ok(Zeroizing::new(plaintext))
    }

    fn sha256(&self, data: &[u8]) -> Result<[u8; 32], EncryptionError> {
        hash::sha256(data)
    }

    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if private_key.len() != ED25519_SEED_LEN {
            return Err(EncryptionError::InvalidSignature(format!(
                "signing key must be a {}-byte seed, got {}",
                ED25519_SEED_LEN,
                private_key.len()
            )));
        }
        let mut seed = [0u8; ED25519_SEED_LEN];
        seed.copy_from_slice(private_key);
        let secret = Ed25519SecretKey::from_seed(&seed).map_err(|e| {
            EncryptionError::InvalidSignature(format!("failed to load signing seed: {:?}", e))
        })?;
        let signature = Ed25519::sign(message, &secret)
            .map_err(|e| EncryptionError::InvalidSignature(format!("signing failed: {:?}", e)))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), EncryptionError> {
        let pk = Ed25519PublicKey::from_bytes(public_key).map_err(|e| {
            EncryptionError::InvalidSignature(format!("malformed verify key: {:?}", e))
        })?;
        let sig = Ed25519Signature::from_bytes(signature).map_err(|e| {
            EncryptionError::InvalidSignature(format!("malformed signature: {:?}", e))
        })?;
        Ed25519::verify(message, &sig, &pk)
            .map_err(|_| EncryptionError::InvalidSignature("signature verification failed".into()))
    }
}

#[cfg(test)]
mod tests;
