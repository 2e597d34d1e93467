//! At-rest encryption of signing key material.
//!
//! Blobs are `base64(nonce) ":" base64(ciphertext || tag)` under
//! AES-256-GCM with a fresh 96-bit nonce per call, so a blob decrypts with
//! nothing but the process secret.

use crate::error::ServiceError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

/// Nonce length for AES-GCM.
pub const NONCE_LEN: usize = 12;

const DELIMITER: char = ':';

/// Symmetric cipher keyed by the process-wide secret.
#[derive(Clone)]
pub struct Cipher {
    inner: Aes256Gcm,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("algorithm", &"AES-256-GCM").finish()
    }
}

impl Cipher {
    /// Create a cipher from a 32-byte secret.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the secret is not 32 bytes.
    pub fn new(secret: &[u8]) -> Result<Self, ServiceError> {
        let inner = Aes256Gcm::new_from_slice(secret)
            .map_err(|_| ServiceError::config("key encryption secret must be 32 bytes"))?;
        Ok(Self { inner })
    }

    /// Create a cipher from the textual secret form accepted by configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the secret is malformed.
    pub fn from_secret_str(secret: &str) -> Result<Self, ServiceError> {
        let key = crate::config::parse_encryption_key(secret)?;
        Self::new(key.as_ref())
    }

    /// Encrypt `plaintext` under a freshly drawn nonce.
    ///
    /// # Errors
    ///
    /// Returns an encryption error if the AEAD rejects the input.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, ServiceError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .inner
            .encrypt(nonce, plaintext)
            .map_err(|e| ServiceError::encryption(e.to_string()))?;

        Ok(format!(
            "{}{DELIMITER}{}",
            STANDARD.encode(nonce_bytes),
            STANDARD.encode(ciphertext)
        ))
    }

    /// Decrypt a blob produced by [`Cipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns a decryption error for malformed blobs, foreign or tampered
    /// nonces, tampered ciphertext, or a different secret.
    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>, ServiceError> {
        let (nonce_b64, ciphertext_b64) = blob
            .split_once(DELIMITER)
            .ok_or_else(|| ServiceError::decryption("missing nonce delimiter"))?;

        let nonce_bytes = STANDARD
            .decode(nonce_b64)
            .map_err(|e| ServiceError::decryption(format!("invalid nonce encoding: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(ServiceError::decryption("invalid nonce length"));
        }

        let ciphertext = STANDARD
            .decode(ciphertext_b64)
            .map_err(|e| ServiceError::decryption(format!("invalid ciphertext encoding: {e}")))?;

        self.inner
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| ServiceError::decryption("authentication failed"))
    }
}
