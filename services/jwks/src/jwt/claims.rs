use serde::{Deserialize, Serialize};

/// Subject used when a token is issued without credentials.
pub const ANONYMOUS_SUBJECT: &str = "sampleUser";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Holder name, kept alongside `sub` for existing consumers
    pub user: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Claims for `subject`, issued at `now` and expiring `ttl_seconds`
    /// later. A negative ttl yields an already-expired claim set.
    pub fn new(subject: impl Into<String>, now: i64, ttl_seconds: i64) -> Self {
        let subject = subject.into();
        Claims {
            user: subject.clone(),
            sub: subject,
            iat: now,
            exp: now.saturating_add(ttl_seconds),
        }
    }

    pub fn is_expired_at(&self, timestamp: i64) -> bool {
        self.exp <= timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(ANONYMOUS_SUBJECT, 1_000, 3600);

        assert_eq!(claims.user, "sampleUser");
        assert_eq!(claims.sub, "sampleUser");
        assert_eq!(claims.exp, 4_600);
        assert!(!claims.is_expired_at(1_000));
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let claims = Claims::new("alice", 1_000, -3600);
        assert_eq!(claims.exp, -2_600);
        assert!(claims.is_expired_at(1_000));
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(Claims::new("bob", 10, 5)).unwrap();
        assert_eq!(json["user"], "bob");
        assert_eq!(json["sub"], "bob");
        assert_eq!(json["iat"], 10);
        assert_eq!(json["exp"], 15);
    }
}
