//! User registration and credential checks.
//!
//! Registration generates the password server-side and hands it back in
//! plaintext exactly once. Only the argon2id hash is stored. Returning a
//! password over the wire is kept for client compatibility and is not a
//! pattern to copy.

use crate::error::ServiceError;
use crate::metrics;
use crate::storage::{NewUser, UserStore};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

/// Message returned when a registration lacks a username or email.
pub const MISSING_FIELDS: &str = "Username and email are required fields.";

/// Outcome of a successful registration.
#[derive(Clone)]
pub struct Registration {
    /// New user id
    pub user_id: i64,
    /// Generated password, shown to the caller once
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("user_id", &self.user_id)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registers users and checks their credentials.
#[derive(Clone)]
pub struct Registrar {
    store: Arc<dyn UserStore>,
}

impl Registrar {
    /// Create a registrar over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Register a user and return their generated password.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] with [`MISSING_FIELDS`] when either
    /// field is absent or blank, [`ServiceError::Conflict`] when the
    /// username or email is taken.
    #[instrument(skip(self, email))]
    pub async fn register(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Registration, ServiceError> {
        let (Some(username), Some(email)) = (non_blank(username), non_blank(email)) else {
            metrics::record_registration("invalid");
            return Err(ServiceError::validation(MISSING_FIELDS));
        };

        let password = Zeroizing::new(uuid::Uuid::new_v4().to_string());
        let password_hash = hash_password(password.clone()).await?;

        let result = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                email: email.to_string(),
            })
            .await;

        match result {
            Ok(user_id) => {
                metrics::record_registration("created");
                info!(user_id, "User registered");
                Ok(Registration { user_id, password })
            }
            Err(e) => {
                metrics::record_registration(if matches!(e, ServiceError::Conflict(_)) {
                    "conflict"
                } else {
                    "error"
                });
                Err(e)
            }
        }
    }

    /// Check a username/password pair and stamp `last_login` on success.
    ///
    /// Returns `None` for a username nobody registered; issuance treats
    /// that caller as anonymous.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidCredentials`] when the user exists and the
    /// password does not match.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<i64>, ServiceError> {
        let Some(user) = self.store.find_user_by_username(username).await? else {
            debug!("Unknown username");
            return Ok(None);
        };

        let password = Zeroizing::new(password.to_string());
        let stored = user.password_hash;
        let matches = tokio::task::spawn_blocking(move || {
            PasswordHash::new(&stored).map(|hash| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &hash)
                    .is_ok()
            })
        })
        .await
        .map_err(|e| ServiceError::internal(format!("password check task failed: {e}")))?
        .map_err(|e| ServiceError::internal(format!("stored hash is malformed: {e}")))?;

        if !matches {
            warn!(user_id = user.id, "Password mismatch");
            return Err(ServiceError::InvalidCredentials);
        }

        self.store.record_login(user.id).await?;
        Ok(Some(user.id))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

async fn hash_password(password: Zeroizing<String>) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|e| ServiceError::internal(format!("password hashing task failed: {e}")))?
    .map_err(|e| ServiceError::Encoding(format!("password hashing failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn registrar() -> (Registrar, MemoryStorage) {
        let store = MemoryStorage::new();
        (Registrar::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let (registrar, _) = registrar();

        for (username, email) in [
            (Some("alice"), None),
            (None, Some("a@example.com")),
            (Some("  "), Some("a@example.com")),
            (None, None),
        ] {
            let err = registrar.register(username, email).await.unwrap_err();
            assert_eq!(err.to_string(), MISSING_FIELDS);
        }
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_password() {
        let (registrar, store) = registrar();
        let registration = registrar
            .register(Some("alice"), Some("alice@example.com"))
            .await
            .unwrap();

        assert!(uuid::Uuid::parse_str(&registration.password).is_ok());

        let user = store.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.id, registration.user_id);
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert!(!user.password_hash.contains(registration.password.as_str()));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let (registrar, store) = registrar();
        let registration = registrar
            .register(Some("bob"), Some("bob@example.com"))
            .await
            .unwrap();

        let id = registrar
            .verify_credentials("bob", &registration.password)
            .await
            .unwrap();
        assert_eq!(id, Some(registration.user_id));
        let user = store.find_user_by_username("bob").await.unwrap().unwrap();
        assert!(user.last_login.is_some());

        assert!(matches!(
            registrar.verify_credentials("bob", "wrong").await,
            Err(ServiceError::InvalidCredentials)
        ));
        assert_eq!(registrar.verify_credentials("nobody", "x").await.unwrap(), None);
    }

    #[test]
    fn test_registration_debug_redacts_password() {
        let registration = Registration {
            user_id: 1,
            password: Zeroizing::new("secret".to_string()),
        };
        assert!(!format!("{registration:?}").contains("secret"));
    }
}
