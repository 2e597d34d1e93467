//! Error taxonomy for the JWKS service.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by key management, token issuance and registration.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The store holds no key of the requested freshness class.
    #[error("No {} signing key available", freshness_label(.expired))]
    NoKeyAvailable {
        /// Whether an expired key was requested
        expired: bool,
    },

    /// Stored key blob could not be decrypted or decoded.
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Key material could not be encrypted.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Requester exceeded the issuance rate.
    #[error("Rate limit exceeded")]
    RateLimited {
        /// When the client may retry
        retry_after: Duration,
    },

    /// Request is missing required fields.
    #[error("{0}")]
    Validation(String),

    /// Submitted credentials do not match a registered user.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Unique constraint violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// RSA key pair generation failed.
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// JWT signing failed.
    #[error("Token signing error: {0}")]
    Signing(String),

    /// Key or credential encoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Persistence layer failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn freshness_label(expired: &bool) -> &'static str {
    if *expired {
        "expired"
    } else {
        "valid"
    }
}

impl ServiceError {
    /// Create a decryption error.
    #[must_use]
    pub fn decryption(msg: impl Into<String>) -> Self {
        Self::Decryption(msg.into())
    }

    /// Create an encryption error.
    #[must_use]
    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::Encryption(msg.into())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a database error.
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller may retry after waiting.
    ///
    /// Key selection and crypto failures are deterministic; only the rate
    /// limit clears on its own.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Stable machine-readable code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoKeyAvailable { .. } => "NO_KEY_AVAILABLE",
            Self::Decryption(_) => "DECRYPTION_ERROR",
            Self::Encryption(_) => "ENCRYPTION_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Conflict(_) => "CONFLICT",
            Self::KeyGeneration(_) => "KEY_GENERATION_ERROR",
            Self::Signing(_) => "SIGNING_ERROR",
            Self::Encoding(_) => "ENCODING_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.is_unique_violation() {
                return Self::Conflict(db.message().to_string());
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ServiceError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Signing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key_display() {
        assert_eq!(
            ServiceError::NoKeyAvailable { expired: true }.to_string(),
            "No expired signing key available"
        );
        assert_eq!(
            ServiceError::NoKeyAvailable { expired: false }.to_string(),
            "No valid signing key available"
        );
    }

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(ServiceError::RateLimited {
            retry_after: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!ServiceError::NoKeyAvailable { expired: false }.is_retryable());
        assert!(!ServiceError::decryption("bad tag").is_retryable());
        assert!(!ServiceError::database("locked").is_retryable());
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = ServiceError::validation("Username and email are required fields.");
        assert_eq!(err.to_string(), "Username and email are required fields.");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
