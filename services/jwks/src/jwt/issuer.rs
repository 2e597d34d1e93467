//! RS256 token issuance.

use crate::error::ServiceError;
use crate::jwt::claims::Claims;
use crate::keys::KeyManager;
use crate::metrics;
use jsonwebtoken::{encode, Header};
use tracing::{debug, instrument};

/// Default token lifetime in seconds.
pub const DEFAULT_TOKEN_TTL: i64 = 3600;

/// A signed token and what it was signed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Compact JWS
    pub token: String,
    /// `kid` header value
    pub kid: String,
    /// `exp` claim value
    pub expires_at: i64,
}

/// Signs claim sets with keys from the pool. Nothing is persisted.
#[derive(Clone)]
pub struct TokenIssuer {
    key_manager: KeyManager,
    token_ttl: i64,
}

impl TokenIssuer {
    /// Create an issuer with the default token lifetime.
    #[must_use]
    pub fn new(key_manager: KeyManager) -> Self {
        Self {
            key_manager,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Override the token lifetime.
    #[must_use]
    pub const fn with_token_ttl(mut self, token_ttl: i64) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    /// Sign a token for `subject`.
    ///
    /// With `want_expired` the token is signed by an expired key and its
    /// `exp` lies `token_ttl` seconds in the past; otherwise a fresh key
    /// signs a token valid for `token_ttl` seconds.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoKeyAvailable`] when the pool has no key of the
    /// requested class, or a signing error.
    #[instrument(skip(self))]
    pub async fn issue(
        &self,
        want_expired: bool,
        subject: &str,
        now: i64,
    ) -> Result<IssuedToken, ServiceError> {
        let key = self.key_manager.acquire_key(want_expired, now).await?;

        let ttl = if want_expired {
            -self.token_ttl
        } else {
            self.token_ttl
        };
        let claims = Claims::new(subject, now, ttl);

        let kid = key.kid();
        let mut header = Header::new(key.algorithm.jwt_algorithm());
        header.kid = Some(kid.clone());
        header.typ = Some("JWT".to_string());

        let token = encode(&header, &claims, &key.encoding_key()?)?;

        let freshness = key.freshness(now);
        metrics::record_token_issued(freshness.as_str(), key.algorithm.as_str());
        debug!(kid = %kid, freshness = freshness.as_str(), "Issued token");

        Ok(IssuedToken {
            token,
            kid,
            expires_at: claims.exp,
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}
