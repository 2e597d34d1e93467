//! Signing key model.

use crate::error::ServiceError;
use jsonwebtoken::{Algorithm, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

/// Freshness class of a stored key, always derived from `exp` against `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freshness {
    /// `exp > now`
    Fresh,
    /// `exp <= now`
    Expired,
}

impl Freshness {
    /// Map the `expired` request flag to a freshness class.
    #[must_use]
    pub const fn from_expired(want_expired: bool) -> Self {
        if want_expired {
            Self::Expired
        } else {
            Self::Fresh
        }
    }

    /// Classify an expiry timestamp at `now`.
    #[must_use]
    pub const fn at(expires_at: i64, now: i64) -> Self {
        if expires_at > now {
            Self::Fresh
        } else {
            Self::Expired
        }
    }

    /// Whether a key expiring at `expires_at` belongs to this class at `now`.
    #[must_use]
    pub fn matches(self, expires_at: i64, now: i64) -> bool {
        Self::at(expires_at, now) == self
    }

    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Expired => "expired",
        }
    }
}

/// Signing algorithm attached to every key. Only RS256 is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256
    #[default]
    Rs256,
}

impl SigningAlgorithm {
    /// Algorithm name for the JWT/JWK `alg` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
        }
    }

    /// JWK key type.
    #[must_use]
    pub const fn key_type(self) -> &'static str {
        match self {
            Self::Rs256 => "RSA",
        }
    }

    /// Algorithm for `jsonwebtoken`.
    #[must_use]
    pub const fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::Rs256 => Algorithm::RS256,
        }
    }
}

/// A decrypted signing key.
///
/// Only ever built by [`KeyManager`](crate::keys::KeyManager) and dropped
/// once the signing or export operation that needed it completes. The
/// private key is zeroized on drop.
pub struct SigningKey {
    /// Key identifier (`kid`)
    pub id: i64,
    /// Signing algorithm
    pub algorithm: SigningAlgorithm,
    /// Private key material
    pub key: RsaPrivateKey,
    /// Expiry, seconds since the epoch
    pub expires_at: i64,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Key identifier as it appears in JWT headers and JWKS entries.
    #[must_use]
    pub fn kid(&self) -> String {
        self.id.to_string()
    }

    /// Freshness at `now`.
    #[must_use]
    pub const fn freshness(&self, now: i64) -> Freshness {
        Freshness::at(self.expires_at, now)
    }

    /// Public half of the key pair.
    #[must_use]
    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }

    /// Build a `jsonwebtoken` encoding key.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the key cannot be serialized.
    pub fn encoding_key(&self) -> Result<EncodingKey, ServiceError> {
        let pem = encode_private_key(&self.key)?;
        EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| ServiceError::Encoding(format!("invalid RSA PEM: {e}")))
    }
}

/// Serialize a private key to PKCS#1 PEM.
///
/// # Errors
///
/// Returns an encoding error if DER encoding fails.
pub fn encode_private_key(key: &RsaPrivateKey) -> Result<Zeroizing<String>, ServiceError> {
    key.to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| ServiceError::Encoding(e.to_string()))
}

/// Parse a private key from PKCS#1 PEM.
///
/// # Errors
///
/// Returns a decryption error: a blob that decrypts but does not decode is
/// as corrupt as one that fails authentication.
pub fn decode_private_key(pem: &str) -> Result<RsaPrivateKey, ServiceError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .map_err(|e| ServiceError::decryption(format!("stored key is not valid PKCS#1: {e}")))
}
