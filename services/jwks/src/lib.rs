//! JWKS service library.
//!
//! Maintains a pool of encrypted RSA signing keys, publishes the fresh
//! ones as a JSON Web Key Set, and issues RS256 tokens whose `kid` header
//! names the signing key.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod config;
pub mod crypto;
pub mod error;
pub mod http;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod metrics;
pub mod shutdown;
pub mod storage;
pub mod users;

// Re-exports for convenience
pub use config::Config;
pub use error::ServiceError;
pub use http::{router, AppState, ServiceOptions};
