//! In-memory storage for tests and local experiments.
//!
//! Mirrors the SQLite semantics: monotonically assigned ids, the same
//! freshness predicates, and unique `username`/`email`. Nothing survives
//! the process.

use super::{AuthLogRecord, AuthLogStore, KeyRow, KeyStore, NewUser, UserRecord, UserStore};
use crate::error::ServiceError;
use crate::keys::Freshness;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    keys: Vec<KeyRow>,
    users: Vec<UserRecord>,
    auth_logs: Vec<AuthLogRecord>,
}

/// Process-local store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw key rows, for asserting what reached storage.
    pub async fn key_rows(&self) -> Vec<KeyRow> {
        self.tables.read().await.keys.clone()
    }
}

#[async_trait]
impl KeyStore for MemoryStorage {
    async fn insert_key(&self, encrypted_key: &str, expires_at: i64) -> Result<i64, ServiceError> {
        let mut tables = self.tables.write().await;
        let kid = tables.keys.last().map_or(1, |row| row.kid + 1);
        tables.keys.push(KeyRow {
            kid,
            key: encrypted_key.to_string(),
            exp: expires_at,
        });
        Ok(kid)
    }

    async fn select_key(
        &self,
        freshness: Freshness,
        now: i64,
    ) -> Result<Option<KeyRow>, ServiceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .keys
            .iter()
            .find(|row| freshness.matches(row.exp, now))
            .cloned())
    }

    async fn select_fresh_keys(&self, now: i64) -> Result<Vec<KeyRow>, ServiceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .keys
            .iter()
            .filter(|row| Freshness::Fresh.matches(row.exp, now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn create_user(&self, user: NewUser) -> Result<i64, ServiceError> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(ServiceError::Conflict(format!(
                "username {} already registered",
                user.username
            )));
        }
        if tables
            .users
            .iter()
            .any(|u| u.email.as_deref() == Some(user.email.as_str()))
        {
            return Err(ServiceError::Conflict("email already registered".to_string()));
        }

        let id = tables.users.last().map_or(1, |u| u.id + 1);
        tables.users.push(UserRecord {
            id,
            username: user.username,
            password_hash: user.password_hash,
            email: Some(user.email),
            date_registered: Utc::now().naive_utc(),
            last_login: None,
        });
        Ok(id)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, ServiceError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn record_login(&self, user_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.last_login = Some(Utc::now().naive_utc());
        }
        Ok(())
    }
}

#[async_trait]
impl AuthLogStore for MemoryStorage {
    async fn append_auth_log(
        &self,
        request_ip: &str,
        user_id: Option<i64>,
    ) -> Result<i64, ServiceError> {
        let mut tables = self.tables.write().await;
        let id = tables.auth_logs.last().map_or(1, |r| r.id + 1);
        tables.auth_logs.push(AuthLogRecord {
            id,
            request_ip: request_ip.to_string(),
            request_timestamp: Utc::now().naive_utc(),
            user_id,
        });
        Ok(id)
    }

    async fn list_auth_logs(&self) -> Result<Vec<AuthLogRecord>, ServiceError> {
        Ok(self.tables.read().await.auth_logs.clone())
    }
}
