//! SQLite-backed storage.

use super::{AuthLogRecord, AuthLogStore, KeyRow, KeyStore, NewUser, UserRecord, UserStore};
use crate::error::ServiceError;
use crate::keys::Freshness;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, instrument};

const SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Durable store holding the `keys`, `users` and `auth_logs` tables.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if needed) the database at `database_url` and apply
    /// the schema.
    ///
    /// `sqlite::memory:` URLs are pinned to a single long-lived connection
    /// so every query sees the same database.
    ///
    /// # Errors
    ///
    /// Returns a database error if the file cannot be opened or the schema
    /// cannot be applied.
    pub async fn connect(database_url: &str) -> Result<Self, ServiceError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        info!(database_url, in_memory, "Database schema ready");
        Ok(Self { pool })
    }

    /// Get the underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_key(row: &SqliteRow) -> Result<KeyRow, ServiceError> {
        Ok(KeyRow {
            kid: row.try_get("kid")?,
            key: row.try_get("key")?,
            exp: row.try_get("exp")?,
        })
    }

    fn row_to_user(row: &SqliteRow) -> Result<UserRecord, ServiceError> {
        Ok(UserRecord {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            email: row.try_get("email")?,
            date_registered: row.try_get("date_registered")?,
            last_login: row.try_get("last_login")?,
        })
    }
}

#[async_trait]
impl KeyStore for SqliteStorage {
    #[instrument(skip(self, encrypted_key))]
    async fn insert_key(&self, encrypted_key: &str, expires_at: i64) -> Result<i64, ServiceError> {
        let kid = sqlx::query("INSERT INTO keys (key, exp) VALUES (?, ?)")
            .bind(encrypted_key)
            .bind(expires_at)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        debug!(kid, "Stored signing key");
        Ok(kid)
    }

    async fn select_key(
        &self,
        freshness: Freshness,
        now: i64,
    ) -> Result<Option<KeyRow>, ServiceError> {
        let sql = match freshness {
            Freshness::Fresh => "SELECT kid, key, exp FROM keys WHERE exp > ? ORDER BY kid LIMIT 1",
            Freshness::Expired => {
                "SELECT kid, key, exp FROM keys WHERE exp <= ? ORDER BY kid LIMIT 1"
            }
        };

        let row = sqlx::query(sql).bind(now).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_key).transpose()
    }

    async fn select_fresh_keys(&self, now: i64) -> Result<Vec<KeyRow>, ServiceError> {
        let rows = sqlx::query("SELECT kid, key, exp FROM keys WHERE exp > ? ORDER BY kid")
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_key).collect()
    }
}

#[async_trait]
impl UserStore for SqliteStorage {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: NewUser) -> Result<i64, ServiceError> {
        let id = sqlx::query("INSERT INTO users (username, password_hash, email) VALUES (?, ?, ?)")
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(id)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, ServiceError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, email, date_registered, last_login
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn record_login(&self, user_id: i64) -> Result<(), ServiceError> {
        sqlx::query("UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuthLogStore for SqliteStorage {
    async fn append_auth_log(
        &self,
        request_ip: &str,
        user_id: Option<i64>,
    ) -> Result<i64, ServiceError> {
        let id = sqlx::query("INSERT INTO auth_logs (request_ip, user_id) VALUES (?, ?)")
            .bind(request_ip)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    async fn list_auth_logs(&self) -> Result<Vec<AuthLogRecord>, ServiceError> {
        let rows = sqlx::query(
            "SELECT id, request_ip, request_timestamp, user_id FROM auth_logs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AuthLogRecord {
                    id: row.try_get("id")?,
                    request_ip: row.try_get("request_ip")?,
                    request_timestamp: row.try_get("request_timestamp")?,
                    user_id: row.try_get("user_id")?,
                })
            })
            .collect()
    }
}
