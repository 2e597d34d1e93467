//! Signing keys and their lifecycle.

pub mod manager;
pub mod signing_key;

pub use manager::{KeyManager, DEFAULT_KEY_BITS};
pub use signing_key::{Freshness, SigningAlgorithm, SigningKey};

/// Current time in seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
