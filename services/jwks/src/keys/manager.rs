//! Key lifecycle: generation, encryption at rest, and freshness-based
//! selection.
//!
//! Every read or write of signing keys goes through [`KeyManager`], which
//! keeps plaintext key material away from the store and recomputes
//! freshness from the caller's `now` on every call.

use super::signing_key::{
    decode_private_key, encode_private_key, Freshness, SigningAlgorithm, SigningKey,
};
use crate::crypto::Cipher;
use crate::error::ServiceError;
use crate::metrics;
use crate::storage::{KeyRow, KeyStore};
use rsa::RsaPrivateKey;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use zeroize::Zeroizing;

/// Default RSA modulus size.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Owns the signing key pool.
#[derive(Clone)]
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    cipher: Arc<Cipher>,
    key_bits: usize,
}

impl KeyManager {
    /// Create a manager over `store`, encrypting with `cipher`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>, cipher: Cipher) -> Self {
        Self {
            store,
            cipher: Arc::new(cipher),
            key_bits: DEFAULT_KEY_BITS,
        }
    }

    /// Override the RSA modulus size.
    #[must_use]
    pub const fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    /// Generate a key expiring `lifetime_seconds` from now and persist it.
    ///
    /// A negative lifetime stores an already-expired key.
    ///
    /// # Errors
    ///
    /// Fails if generation, encryption or the insert fails.
    pub async fn generate_and_store(&self, lifetime_seconds: i64) -> Result<i64, ServiceError> {
        self.generate_and_store_at(lifetime_seconds, super::unix_now())
            .await
    }

    /// [`generate_and_store`](Self::generate_and_store) against an explicit clock.
    ///
    /// # Errors
    ///
    /// Fails if generation, encryption or the insert fails.
    #[instrument(skip(self))]
    pub async fn generate_and_store_at(
        &self,
        lifetime_seconds: i64,
        now: i64,
    ) -> Result<i64, ServiceError> {
        let bits = self.key_bits;
        let key = tokio::task::spawn_blocking(move || {
            RsaPrivateKey::new(&mut rand::thread_rng(), bits)
        })
        .await
        .map_err(|e| ServiceError::internal(format!("key generation task failed: {e}")))?
        .map_err(|e| ServiceError::KeyGeneration(e.to_string()))?;

        let blob = {
            let pem = encode_private_key(&key)?;
            self.cipher.encrypt(pem.as_bytes())?
        };

        let expires_at = now.saturating_add(lifetime_seconds);
        let kid = self.store.insert_key(&blob, expires_at).await?;

        let freshness = Freshness::at(expires_at, now);
        metrics::record_key_operation("generate", freshness.as_str());
        info!(kid, expires_at, freshness = freshness.as_str(), "Generated signing key");

        Ok(kid)
    }

    /// Seed the pool with one expired and one fresh key.
    ///
    /// # Errors
    ///
    /// Fails if either key cannot be generated or stored.
    pub async fn seed(
        &self,
        expired_lifetime: i64,
        fresh_lifetime: i64,
    ) -> Result<(), ServiceError> {
        self.generate_and_store(expired_lifetime).await?;
        self.generate_and_store(fresh_lifetime).await?;
        Ok(())
    }

    /// Add a fresh key to the pool. Existing keys are left to age out.
    ///
    /// # Errors
    ///
    /// Fails with a validation error for a non-positive lifetime, otherwise
    /// as [`generate_and_store`](Self::generate_and_store).
    pub async fn rotate(&self, lifetime_seconds: i64) -> Result<i64, ServiceError> {
        if lifetime_seconds <= 0 {
            return Err(ServiceError::validation("rotation lifetime must be positive"));
        }
        self.generate_and_store(lifetime_seconds).await
    }

    /// Fetch and decrypt one key of the requested freshness.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoKeyAvailable`] when the pool has no key of that
    /// class; [`ServiceError::Decryption`] when the stored blob is corrupt.
    #[instrument(skip(self))]
    pub async fn acquire_key(
        &self,
        want_expired: bool,
        now: i64,
    ) -> Result<SigningKey, ServiceError> {
        let freshness = Freshness::from_expired(want_expired);

        let row = self
            .store
            .select_key(freshness, now)
            .await?
            .ok_or(ServiceError::NoKeyAvailable {
                expired: want_expired,
            })?;

        if !freshness.matches(row.exp, now) {
            warn!(kid = row.kid, exp = row.exp, now, "Store returned key of wrong freshness");
            return Err(ServiceError::NoKeyAvailable {
                expired: want_expired,
            });
        }

        self.decode_row(row)
    }

    /// Fetch and decrypt every key with `exp > now`.
    ///
    /// # Errors
    ///
    /// Fails on the first row that does not decrypt.
    pub async fn fetch_all_fresh_keys(&self, now: i64) -> Result<Vec<SigningKey>, ServiceError> {
        self.store
            .select_fresh_keys(now)
            .await?
            .into_iter()
            .filter(|row| Freshness::Fresh.matches(row.exp, now))
            .map(|row| self.decode_row(row))
            .collect()
    }

    fn decode_row(&self, row: KeyRow) -> Result<SigningKey, ServiceError> {
        let plaintext = Zeroizing::new(self.cipher.decrypt(&row.key)?);
        let pem = std::str::from_utf8(&plaintext)
            .map_err(|_| ServiceError::decryption("stored key is not UTF-8"))?;
        let key = decode_private_key(pem)?;

        Ok(SigningKey {
            id: row.kid,
            algorithm: SigningAlgorithm::Rs256,
            key,
            expires_at: row.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn manager(store: &MemoryStorage) -> KeyManager {
        KeyManager::new(Arc::new(store.clone()), Cipher::new(&[9u8; 32]).unwrap())
    }

    #[tokio::test]
    async fn test_empty_pool_reports_no_key() {
        let store = MemoryStorage::new();
        let manager = manager(&store);

        for want_expired in [true, false] {
            let err = manager.acquire_key(want_expired, 1_000).await.unwrap_err();
            assert!(matches!(err, ServiceError::NoKeyAvailable { expired } if expired == want_expired));
        }
        assert!(manager.fetch_all_fresh_keys(1_000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_blob_is_not_plaintext() {
        let store = MemoryStorage::new();
        let manager = manager(&store);
        manager.generate_and_store_at(60, 1_000).await.unwrap();

        let rows = store.key_rows().await;
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].key.contains("PRIVATE KEY"));
        assert_eq!(rows[0].exp, 1_060);
    }

    #[tokio::test]
    async fn test_corrupt_blob_surfaces_decryption_error() {
        let store = MemoryStorage::new();
        store.insert_key("AAAAAAAAAAAAAAAA:AAAA", 5_000).await.unwrap();
        let manager = manager(&store);

        assert!(matches!(
            manager.acquire_key(false, 1_000).await,
            Err(ServiceError::Decryption(_))
        ));
    }

    #[tokio::test]
    async fn test_rotate_rejects_non_positive_lifetime() {
        let store = MemoryStorage::new();
        assert!(matches!(
            manager(&store).rotate(0).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(store.key_rows().await.is_empty());
    }
}
