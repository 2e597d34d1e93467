//! HTTP surface: router, shared state and error mapping.

pub mod error;
pub mod handlers;

use crate::audit::AuthLogWriter;
use crate::config::Config;
use crate::crypto::Cipher;
use crate::jwt::{TokenIssuer, DEFAULT_TOKEN_TTL};
use crate::keys::{KeyManager, DEFAULT_KEY_BITS};
use crate::storage::Storage;
use crate::users::Registrar;
use axum::routing::{get, post};
use axum::Router;
use rust_common::{RateLimitConfig, SlidingWindowLimiter};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Tunables for the request-serving components.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// RSA modulus size for generated keys
    pub key_bits: usize,
    /// Issued token lifetime in seconds
    pub token_ttl: i64,
    /// `/auth` rate limit
    pub rate_limit: RateLimitConfig,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            token_ttl: DEFAULT_TOKEN_TTL,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            key_bits: config.key_bits,
            token_ttl: config.token_ttl,
            rate_limit: config.rate_limit.clone(),
        }
    }
}

/// State shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Signing key pool
    pub key_manager: KeyManager,
    /// Token signer
    pub issuer: TokenIssuer,
    /// Registration and credential checks
    pub registrar: Registrar,
    /// Auth attempt log
    pub auth_log: AuthLogWriter,
    /// Per-address `/auth` limiter
    pub rate_limiter: SlidingWindowLimiter,
}

impl AppState {
    /// Wire every component over one storage backend.
    #[must_use]
    pub fn new<S: Storage + 'static>(storage: Arc<S>, cipher: Cipher, options: ServiceOptions) -> Self {
        let key_manager =
            KeyManager::new(storage.clone(), cipher).with_key_bits(options.key_bits);
        let issuer = TokenIssuer::new(key_manager.clone()).with_token_ttl(options.token_ttl);

        Self {
            key_manager,
            issuer,
            registrar: Registrar::new(storage.clone()),
            auth_log: AuthLogWriter::new(storage),
            rate_limiter: SlidingWindowLimiter::new(options.rate_limit),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/register",
            post(handlers::register).fallback(handlers::method_not_allowed),
        )
        .route(
            "/auth",
            post(handlers::auth).fallback(handlers::method_not_allowed),
        )
        .route(
            "/.well-known/jwks.json",
            get(handlers::jwks).fallback(handlers::method_not_allowed),
        )
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::export_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
