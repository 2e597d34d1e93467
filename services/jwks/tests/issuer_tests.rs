//! Token issuance verified against the published key set.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use jwks_service::crypto::Cipher;
use jwks_service::jwks::{Jwk, JwksAssembler};
use jwks_service::jwt::{Claims, TokenIssuer, ANONYMOUS_SUBJECT};
use jwks_service::keys::{unix_now, KeyManager};
use jwks_service::storage::MemoryStorage;
use jwks_service::ServiceError;
use std::sync::Arc;

async fn seeded() -> (KeyManager, TokenIssuer) {
    let manager = KeyManager::new(Arc::new(MemoryStorage::new()), Cipher::new(&[5u8; 32]).unwrap());
    manager.seed(-3600, 3600).await.unwrap();
    let issuer = TokenIssuer::new(manager.clone());
    (manager, issuer)
}

fn verify(token: &str, jwk: &Jwk, validate_exp: bool) -> Claims {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = validate_exp;
    let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).unwrap();
    decode::<Claims>(token, &key, &validation).unwrap().claims
}

#[tokio::test]
async fn test_fresh_token_verifies_against_jwks() {
    let (manager, issuer) = seeded().await;
    let now = unix_now();

    let issued = issuer.issue(false, ANONYMOUS_SUBJECT, now).await.unwrap();

    let header = decode_header(&issued.token).unwrap();
    assert_eq!(header.alg, Algorithm::RS256);
    assert_eq!(header.typ.as_deref(), Some("JWT"));
    assert_eq!(header.kid.as_deref(), Some(issued.kid.as_str()));

    let jwks = JwksAssembler::render(&manager.fetch_all_fresh_keys(now).await.unwrap());
    let jwk = jwks.find(&issued.kid).expect("kid must be published");

    let claims = verify(&issued.token, jwk, true);
    assert_eq!(claims.user, "sampleUser");
    assert_eq!(claims.sub, "sampleUser");
    assert_eq!(claims.iat, now);
    assert_eq!(claims.exp, now + 3600);
    assert_eq!(issued.expires_at, claims.exp);
}

#[tokio::test]
async fn test_expired_token_is_signed_by_unpublished_key() {
    let (manager, issuer) = seeded().await;
    let now = unix_now();

    let issued = issuer.issue(true, "alice", now).await.unwrap();
    assert!(issued.expires_at < now);

    let jwks = JwksAssembler::render(&manager.fetch_all_fresh_keys(now).await.unwrap());
    assert!(jwks.find(&issued.kid).is_none());

    let expired_key = manager.acquire_key(true, now).await.unwrap();
    assert_eq!(expired_key.kid(), issued.kid);
    let claims = verify(&issued.token, &JwksAssembler::to_jwk(&expired_key), false);
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.exp, now - 3600);

    // Strict validation rejects it
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = 0;
    let jwk = JwksAssembler::to_jwk(&expired_key);
    let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).unwrap();
    assert!(decode::<Claims>(&issued.token, &key, &validation).is_err());
}

#[tokio::test]
async fn test_custom_ttl() {
    let (_, issuer) = seeded().await;
    let issuer = issuer.with_token_ttl(60);
    let now = unix_now();

    assert_eq!(issuer.issue(false, "bob", now).await.unwrap().expires_at, now + 60);
    assert_eq!(issuer.issue(true, "bob", now).await.unwrap().expires_at, now - 60);
}

#[tokio::test]
async fn test_empty_pool_propagates_no_key() {
    let manager = KeyManager::new(Arc::new(MemoryStorage::new()), Cipher::new(&[5u8; 32]).unwrap());
    let issuer = TokenIssuer::new(manager);

    assert!(matches!(
        issuer.issue(false, ANONYMOUS_SUBJECT, unix_now()).await,
        Err(ServiceError::NoKeyAvailable { expired: false })
    ));
}
