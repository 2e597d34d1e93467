//! Durable tables behind the service.
//!
//! Three append-oriented tables live in one store: `keys` (encrypted
//! signing keys), `users` (credentials) and `auth_logs` (issuance
//! attempts). The core only needs [`KeyStore`]; the HTTP layer also uses
//! [`UserStore`] and [`AuthLogStore`].

pub mod memory;
pub mod sqlite;

use crate::error::ServiceError;
use crate::keys::Freshness;
use async_trait::async_trait;
use chrono::NaiveDateTime;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// A row of the `keys` table. `key` is always the encrypted blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRow {
    /// Key identifier
    pub kid: i64,
    /// Nonce-prefixed ciphertext of the PKCS#1 PEM
    pub key: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Credentials to insert into the `users` table.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique login name
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Unique email address
    pub email: String,
}

/// A row of the `users` table.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// User identifier
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Email address
    pub email: Option<String>,
    /// Registration time (UTC)
    pub date_registered: NaiveDateTime,
    /// Last successful credential check (UTC)
    pub last_login: Option<NaiveDateTime>,
}

/// A row of the `auth_logs` table.
#[derive(Debug, Clone)]
pub struct AuthLogRecord {
    /// Row identifier
    pub id: i64,
    /// Requester address
    pub request_ip: String,
    /// Time of the attempt (UTC)
    pub request_timestamp: NaiveDateTime,
    /// Authenticated user, when known
    pub user_id: Option<i64>,
}

/// Signing key table.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Append an encrypted key and return its identifier.
    async fn insert_key(&self, encrypted_key: &str, expires_at: i64) -> Result<i64, ServiceError>;

    /// Return any one key of the given freshness at `now`.
    async fn select_key(
        &self,
        freshness: Freshness,
        now: i64,
    ) -> Result<Option<KeyRow>, ServiceError>;

    /// Return every key with `exp > now`.
    async fn select_fresh_keys(&self, now: i64) -> Result<Vec<KeyRow>, ServiceError>;
}

/// Credentials table.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with [`ServiceError::Conflict`] on a duplicate
    /// username or email.
    async fn create_user(&self, user: NewUser) -> Result<i64, ServiceError>;

    /// Look a user up by login name.
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, ServiceError>;

    /// Stamp `last_login` with the current time.
    async fn record_login(&self, user_id: i64) -> Result<(), ServiceError>;
}

/// Append-only log of issuance attempts.
#[async_trait]
pub trait AuthLogStore: Send + Sync {
    /// Append one attempt record.
    async fn append_auth_log(
        &self,
        request_ip: &str,
        user_id: Option<i64>,
    ) -> Result<i64, ServiceError>;

    /// All records in insertion order.
    async fn list_auth_logs(&self) -> Result<Vec<AuthLogRecord>, ServiceError>;
}

/// Everything the service persists.
pub trait Storage: KeyStore + UserStore + AuthLogStore {}

impl<T: KeyStore + UserStore + AuthLogStore> Storage for T {}
