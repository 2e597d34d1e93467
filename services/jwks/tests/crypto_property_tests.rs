//! Property-based tests for key material encryption.
//!
//! Round-trip, nonce freshness and tamper detection of the
//! `base64(nonce):base64(ciphertext)` blob format.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jwks_service::crypto::Cipher;
use jwks_service::ServiceError;
use proptest::prelude::*;

fn arb_secret() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

fn arb_plaintext() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

/// Flip one bit of the decoded part selected by `part` and re-encode.
fn tamper(blob: &str, part: usize, index: usize, bit: u8) -> String {
    let (nonce, ct) = blob.split_once(':').unwrap();
    let mut parts = [STANDARD.decode(nonce).unwrap(), STANDARD.decode(ct).unwrap()];
    let target = &mut parts[part];
    let i = index % target.len();
    target[i] ^= 1 << (bit % 8);
    format!("{}:{}", STANDARD.encode(&parts[0]), STANDARD.encode(&parts[1]))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_round_trip(secret in arb_secret(), plaintext in arb_plaintext()) {
        let cipher = Cipher::new(&secret).unwrap();
        let blob = cipher.encrypt(&plaintext).unwrap();
        prop_assert_eq!(cipher.decrypt(&blob).unwrap(), plaintext);
    }

    #[test]
    fn prop_same_plaintext_encrypts_differently(
        secret in arb_secret(),
        plaintext in arb_plaintext(),
    ) {
        let cipher = Cipher::new(&secret).unwrap();
        let a = cipher.encrypt(&plaintext).unwrap();
        let b = cipher.encrypt(&plaintext).unwrap();
        prop_assert_ne!(a, b);
    }

    #[test]
    fn prop_tampered_blob_is_rejected(
        secret in arb_secret(),
        plaintext in prop::collection::vec(any::<u8>(), 1..512),
        part in 0usize..2,
        index in any::<usize>(),
        bit in any::<u8>(),
    ) {
        let cipher = Cipher::new(&secret).unwrap();
        let blob = cipher.encrypt(&plaintext).unwrap();
        let tampered = tamper(&blob, part, index, bit);

        prop_assert!(matches!(cipher.decrypt(&tampered), Err(ServiceError::Decryption(_))));
    }

    #[test]
    fn prop_wrong_secret_is_rejected(
        secret in arb_secret(),
        other in arb_secret(),
        plaintext in arb_plaintext(),
    ) {
        prop_assume!(secret != other);
        let blob = Cipher::new(&secret).unwrap().encrypt(&plaintext).unwrap();
        prop_assert!(Cipher::new(&other).unwrap().decrypt(&blob).is_err());
    }

    #[test]
    fn prop_garbage_never_panics(input in ".{0,128}") {
        let cipher = Cipher::new(&[7u8; 32]).unwrap();
        let _ = cipher.decrypt(&input);
    }
}
