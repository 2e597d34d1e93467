//! Projection of signing keys into their public JWK form.

use crate::keys::SigningKey;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};

/// Public half of one RSA signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `RSA`
    pub kty: String,
    /// Key identifier, matching the `kid` header of tokens it signed
    pub kid: String,
    /// Intended use, always `sig`
    #[serde(rename = "use")]
    pub key_use: String,
    /// Algorithm, always `RS256`
    pub alg: String,
    /// Modulus, base64url without padding
    pub n: String,
    /// Public exponent, base64url without padding
    pub e: String,
}

/// The document served at `/.well-known/jwks.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// Published keys
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Look a key up by identifier.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// Stateless renderer from [`SigningKey`] to [`Jwks`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JwksAssembler;

impl JwksAssembler {
    /// Render one JWK per key, in input order.
    ///
    /// Only public components are read; callers decide which keys are
    /// eligible for publication.
    #[must_use]
    pub fn render(keys: &[SigningKey]) -> Jwks {
        Jwks {
            keys: keys.iter().map(Self::to_jwk).collect(),
        }
    }

    /// Render a single key.
    #[must_use]
    pub fn to_jwk(key: &SigningKey) -> Jwk {
        let public = key.public_key();
        Jwk {
            kty: key.algorithm.key_type().to_string(),
            kid: key.kid(),
            key_use: "sig".to_string(),
            alg: key.algorithm.as_str().to_string(),
            n: URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SigningAlgorithm;
    use rsa::RsaPrivateKey;

    fn key(id: i64) -> SigningKey {
        SigningKey {
            id,
            algorithm: SigningAlgorithm::Rs256,
            key: RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap(),
            expires_at: 0,
        }
    }

    #[test]
    fn test_empty_input_renders_empty_set() {
        let jwks = JwksAssembler::render(&[]);
        assert!(jwks.keys.is_empty());
        assert_eq!(serde_json::to_string(&jwks).unwrap(), r#"{"keys":[]}"#);
    }

    #[test]
    fn test_jwk_fields() {
        let jwks = JwksAssembler::render(&[key(7)]);
        let jwk = jwks.find("7").unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.key_use, "sig");
        assert_eq!(jwk.alg, "RS256");
        // 65537
        assert_eq!(jwk.e, "AQAB");
        assert!(!jwk.n.contains('='));

        let json = serde_json::to_value(jwk).unwrap();
        assert_eq!(json["use"], "sig");
        assert!(json.get("d").is_none());
    }

    #[test]
    fn test_preserves_input_order() {
        let jwks = JwksAssembler::render(&[key(3), key(1)]);
        let kids: Vec<_> = jwks.keys.iter().map(|k| k.kid.as_str()).collect();
        assert_eq!(kids, ["3", "1"]);
    }
}
