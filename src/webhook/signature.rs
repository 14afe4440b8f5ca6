//! HMAC-SHA256 webhook signature verification.
//!
//! GitHub signs each delivery with the shared secret and sends the digest in
//! the `X-Hub-Signature-256` header as `sha256=<lowercase hex>`. The secret
//! itself never travels over the wire.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Scheme tag GitHub puts in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("signature header is missing")]
    MissingSignature,

    #[error("signature does not match payload")]
    Mismatch,

    #[error("webhook secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Computes the header value a holder of `secret` would send for `body`.
pub fn sign(body: &[u8], secret: &[u8]) -> Result<String, AuthError> {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return Err(AuthError::InvalidKey),
    };
    mac.update(body);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Checks `presented` against the signature of `body` under `secret`.
///
/// The comparison runs in constant time over the full header value, so a
/// forged signature learns nothing from how long the check took. Headers of
/// a different length simply compare unequal.
///
/// # Examples
///
/// ```
/// use ci_update_server::webhook::signature::{sign, verify, AuthError};
///
/// let header = sign(b"payload", b"secret").unwrap();
/// assert_eq!(verify(b"payload", &header, b"secret"), Ok(()));
/// assert_eq!(verify(b"payload", &header, b"other"), Err(AuthError::Mismatch));
/// ```
pub fn verify(body: &[u8], presented: &str, secret: &[u8]) -> Result<(), AuthError> {
    let expected = sign(body, secret)?;
    if bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn github_documentation_example() {
        // https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";
        assert_eq!(verify(b"Hello, World!", header, b"It's a Secret to Everybody"), Ok(()));
    }

    #[test]
    fn sign_produces_prefixed_lowercase_hex() {
        let header = sign(b"body", b"secret").unwrap();
        let hex_part = header.strip_prefix(SIGNATURE_PREFIX).unwrap();
        assert_eq!(hex_part.len(), 64);
        assert!(hex_part.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn keys_of_any_length_sign_and_verify() {
        for len in [0, 1, 63, 64, 65, 1024] {
            let secret = vec![0x5a; len];
            let header = sign(b"body", &secret).unwrap();
            assert_eq!(verify(b"body", &header, &secret), Ok(()), "key length {len}");
        }
    }

    #[test]
    fn wrong_secret_fails() {
        let header = sign(b"body", b"secret").unwrap();
        assert_eq!(verify(b"body", &header, b"secret2"), Err(AuthError::Mismatch));
    }

    #[test]
    fn tampered_body_fails() {
        let header = sign(b"{\"action\":\"published\"}", b"secret").unwrap();
        assert_eq!(
            verify(b"{\"action\":\"deleted\"}", &header, b"secret"),
            Err(AuthError::Mismatch)
        );
    }

    #[test]
    fn empty_header_fails() {
        assert_eq!(verify(b"body", "", b"secret"), Err(AuthError::Mismatch));
    }

    #[test]
    fn truncated_and_extended_headers_fail() {
        let header = sign(b"body", b"secret").unwrap();
        assert_eq!(
            verify(b"body", &header[..header.len() - 1], b"secret"),
            Err(AuthError::Mismatch)
        );
        assert_eq!(
            verify(b"body", &format!("{}0", header), b"secret"),
            Err(AuthError::Mismatch)
        );
    }

    #[test]
    fn uppercase_hex_is_not_an_exact_match() {
        let header = sign(b"body", b"secret").unwrap();
        let upper = format!(
            "{}{}",
            SIGNATURE_PREFIX,
            header[SIGNATURE_PREFIX.len()..].to_uppercase()
        );
        assert_eq!(verify(b"body", &upper, b"secret"), Err(AuthError::Mismatch));
    }

    #[test]
    fn missing_prefix_fails() {
        let header = sign(b"body", b"secret").unwrap();
        let bare = header.strip_prefix(SIGNATURE_PREFIX).unwrap();
        assert_eq!(verify(b"body", bare, b"secret"), Err(AuthError::Mismatch));
    }

    proptest! {
        #[test]
        fn prop_sign_verify_roundtrip(body: Vec<u8>, secret: Vec<u8>) {
            let header = sign(&body, &secret).unwrap();
            prop_assert_eq!(verify(&body, &header, &secret), Ok(()));
        }

        #[test]
        fn prop_body_bit_flip_fails(
            body in proptest::collection::vec(any::<u8>(), 1..256),
            secret: Vec<u8>,
            index: usize,
            bit in 0u8..8,
        ) {
            let header = sign(&body, &secret).unwrap();
            let mut mutated = body.clone();
            let i = index % mutated.len();
            mutated[i] ^= 1 << bit;
            prop_assert_eq!(verify(&mutated, &header, &secret), Err(AuthError::Mismatch));
        }

        #[test]
        fn prop_secret_bit_flip_fails(
            body: Vec<u8>,
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            index: usize,
            bit in 0u8..8,
        ) {
            let header = sign(&body, &secret).unwrap();
            let mut mutated = secret.clone();
            let i = index % mutated.len();
            mutated[i] ^= 1 << bit;
            prop_assert_eq!(verify(&body, &header, &mutated), Err(AuthError::Mismatch));
        }

        #[test]
        fn prop_arbitrary_header_never_panics(header: String, body: Vec<u8>, secret: Vec<u8>) {
            let expected = sign(&body, &secret).unwrap();
            prop_assume!(header != expected);
            prop_assert_eq!(verify(&body, &header, &secret), Err(AuthError::Mismatch));
        }
    }
}
