//! Centralized configuration for the JWKS service.
//!
//! All configuration is loaded from environment variables (optionally via a
//! `.env` file) and validated at startup. A missing or malformed key
//! encryption secret is fatal.

use crate::error::ServiceError;
use rust_common::{RateLimitConfig, TracingConfig};
use std::env;
use std::time::Duration;
use zeroize::Zeroizing;

/// Name of the environment variable holding the key encryption secret.
pub const SECRET_ENV: &str = "NOT_MY_KEY";

/// JWKS service configuration.
#[derive(Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,

    // Storage
    /// SQLite connection URL
    pub database_url: String,

    // Key lifecycle
    /// RSA modulus size in bits
    pub key_bits: usize,
    /// Lifetime of the seeded expired key (negative)
    pub expired_key_lifetime: i64,
    /// Lifetime of the seeded fresh key
    pub fresh_key_lifetime: i64,
    /// Issued token lifetime in seconds
    pub token_ttl: i64,

    // Rate limiting
    /// Issuance rate limit
    pub rate_limit: RateLimitConfig,

    // Logging
    /// Tracing configuration
    pub tracing: TracingConfig,

    // Security
    /// Key encryption secret (32 bytes for AES-256)
    pub encryption_key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("key_bits", &self.key_bits)
            .field("expired_key_lifetime", &self.expired_key_lifetime)
            .field("fresh_key_lifetime", &self.fresh_key_lifetime)
            .field("token_ttl", &self.token_ttl)
            .field("rate_limit", &self.rate_limit)
            .field("encryption_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ServiceError> {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_env("PORT", 8080)?;
        let shutdown_timeout = Duration::from_secs(parse_env("SHUTDOWN_TIMEOUT", 30)?);

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://totally_not_my_privateKeys.db".to_string());

        let key_bits = parse_env("KEY_BITS", 2048)?;
        let expired_key_lifetime = parse_env("EXPIRED_KEY_LIFETIME", -3600)?;
        let fresh_key_lifetime = parse_env("FRESH_KEY_LIFETIME", 3600)?;
        let token_ttl = parse_env("TOKEN_TTL", 3600)?;

        let rate_limit = RateLimitConfig::default()
            .with_max_requests(parse_env("RATE_LIMIT_REQUESTS", 10)?)
            .with_window(Duration::from_millis(parse_env("RATE_LIMIT_WINDOW_MS", 1000)?));

        let tracing = TracingConfig::default()
            .with_service_name("jwks-service")
            .with_log_level(env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
            .with_json_output(parse_env("LOG_JSON", false)?);

        let secret = env::var(SECRET_ENV)
            .map_err(|_| ServiceError::config(format!("{SECRET_ENV} must be set")))?;
        let encryption_key = parse_encryption_key(&secret)?;

        let config = Self {
            host,
            port,
            shutdown_timeout,
            database_url,
            key_bits,
            expired_key_lifetime,
            fresh_key_lifetime,
            token_ttl,
            rate_limit,
            tracing,
            encryption_key,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ServiceError> {
        if self.port == 0 {
            return Err(ServiceError::config("PORT must be between 1 and 65535"));
        }
        if self.key_bits < 2048 {
            return Err(ServiceError::config("KEY_BITS must be at least 2048"));
        }
        if self.expired_key_lifetime >= 0 {
            return Err(ServiceError::config("EXPIRED_KEY_LIFETIME must be negative"));
        }
        if self.fresh_key_lifetime <= 0 {
            return Err(ServiceError::config("FRESH_KEY_LIFETIME must be positive"));
        }
        if self.token_ttl <= 0 {
            return Err(ServiceError::config("TOKEN_TTL must be positive"));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window.is_zero() {
            return Err(ServiceError::config("rate limit must admit at least one request"));
        }
        Ok(())
    }

    /// Socket address string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ServiceError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| ServiceError::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

/// Parse the key encryption secret.
///
/// Accepts exactly 32 raw bytes, or standard base64 decoding to 32 bytes.
///
/// # Errors
///
/// Returns a configuration error for any other length or encoding.
pub fn parse_encryption_key(secret: &str) -> Result<Zeroizing<[u8; 32]>, ServiceError> {
    let mut key = Zeroizing::new([0u8; 32]);

    if secret.len() == 32 {
        key.copy_from_slice(secret.as_bytes());
        return Ok(key);
    }

    let bytes = Zeroizing::new(
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, secret.trim())
            .map_err(|e| ServiceError::config(format!("Invalid {SECRET_ENV}: {e}")))?,
    );

    if bytes.len() != 32 {
        return Err(ServiceError::config(format!(
            "{SECRET_ENV} must be 32 bytes, got {}",
            bytes.len()
        )));
    }

    key.copy_from_slice(&bytes);
    Ok(key)
}
