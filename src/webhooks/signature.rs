//! GitHub webhook signature verification using HMAC-SHA1.
//!
//! GitHub signs webhook payloads using HMAC-SHA1 with a shared secret.
//! The signature is provided in the `X-Hub-Signature` header as `sha1=<hex>`.
//!
//! Verification runs over the raw body bytes, before any parsing. An empty
//! [`Secret`] switches verification off entirely; that is an explicit choice
//! the deployment makes, not a fallback.

use std::fmt;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Prefix GitHub puts in front of the hex digest.
const SIGNATURE_PREFIX: &str = "sha1=";

/// The signature on a delivery was missing or did not match.
///
/// This is the only failure attributable to the sender; it maps to
/// `403 Forbidden` at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// A secret is configured but the request carried no signature.
    #[error("signature not found")]
    NotFound,

    /// The signature does not match the body under the configured secret.
    #[error("signature invalid")]
    Invalid,
}

/// Errors returned by [`verify`].
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Missing or mismatched signature.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The HMAC could not be computed.
    #[error("could not generate hmac signature: {0}")]
    Internal(String),
}

/// A shared webhook secret, used as the HMAC key.
///
/// The zero-length secret disables verification.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Secret(secret.into())
    }

    /// Returns true if this secret turns verification off.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Verifies `signature` (an `X-Hub-Signature` value) against `body`.
    pub fn verify(&self, signature: impl AsRef<[u8]>, body: &[u8]) -> Result<(), VerifyError> {
        verify(self, signature, body)
    }
}

// Never print key material.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Secret(s.as_bytes().to_vec())
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Secret(s.into_bytes())
    }
}

impl From<Vec<u8>> for Secret {
    fn from(bytes: Vec<u8>) -> Self {
        Secret(bytes)
    }
}

/// Computes the HMAC-SHA1 signature of a payload using the given secret.
///
/// This is useful for testing purposes (generating expected signatures).
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a GitHub-style header value.
///
/// Returns a string in the format "sha1=<hex>".
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", hex::encode(signature))
}

/// Verifies a GitHub webhook signature against the payload and secret.
///
/// * An empty `secret` always succeeds.
/// * An empty `signature` fails with [`SignatureError::NotFound`].
/// * Otherwise the expected `sha1=<hex>` string is compared with the raw
///   `signature` bytes in constant time; any difference, including length,
///   prefix or bytes that are not UTF-8, fails with [`SignatureError::Invalid`].
///
/// # Examples
///
/// ```
/// use hub_hooks::webhooks::{Secret, SignatureError, VerifyError, verify};
///
/// let secret = Secret::from("super-secret");
/// let body = b"hello-world";
///
/// assert!(verify(&secret, "sha1=8942fc54602322464f81a966cbd09a17077d4702", body).is_ok());
/// assert!(matches!(
///     verify(&secret, "sha1=bunk", body),
///     Err(VerifyError::Signature(SignatureError::Invalid))
/// ));
/// ```
pub fn verify(
    secret: &Secret,
    signature: impl AsRef<[u8]>,
    body: &[u8],
) -> Result<(), VerifyError> {
    let signature = signature.as_ref();
    if secret.is_empty() {
        return Ok(());
    }

    if signature.is_empty() {
        return Err(SignatureError::NotFound.into());
    }

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| VerifyError::Internal(e.to_string()))?;
    mac.update(body);

    let expected = format_signature_header(&mac.finalize().into_bytes());

    // `ct_eq` on slices of different length returns false without comparing
    // contents; for equal lengths it inspects every byte.
    if bool::from(expected.as_bytes().ct_eq(signature)) {
        Ok(())
    } else {
        Err(SignatureError::Invalid.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KNOWN_SIGNATURE: &str = "sha1=8942fc54602322464f81a966cbd09a17077d4702";

    fn sign(payload: &[u8], secret: &[u8]) -> String {
        format_signature_header(&compute_signature(payload, secret))
    }

    #[test]
    fn valid_signature_passes() {
        let secret = Secret::from("super-secret");
        assert!(verify(&secret, KNOWN_SIGNATURE, b"hello-world").is_ok());
    }

    #[test]
    fn known_vector_matches_compute() {
        assert_eq!(sign(b"hello-world", b"super-secret"), KNOWN_SIGNATURE);
    }

    #[test]
    fn bunk_signature_is_invalid() {
        let secret = Secret::from("super-secret");
        let err = verify(&secret, "sha1=bunk", b"hello-world").unwrap_err();
        assert!(matches!(err, VerifyError::Signature(SignatureError::Invalid)));
        assert_eq!(err.to_string(), "signature invalid");
    }

    #[test]
    fn empty_signature_is_not_found() {
        let secret = Secret::from("super-secret");
        let err = verify(&secret, "", b"hello-world").unwrap_err();
        assert!(matches!(err, VerifyError::Signature(SignatureError::NotFound)));
        assert_eq!(err.to_string(), "signature not found");
    }

    #[test]
    fn empty_secret_skips_verification() {
        let secret = Secret::default();
        assert!(verify(&secret, "bunk", b"hello-world").is_ok());
        assert!(verify(&secret, "", b"hello-world").is_ok());
    }

    #[test]
    fn wrong_algorithm_prefix_is_invalid() {
        let secret = Secret::from("super-secret");
        let sha256_style = KNOWN_SIGNATURE.replacen("sha1=", "sha256=", 1);
        assert!(matches!(
            verify(&secret, &sha256_style, b"hello-world"),
            Err(VerifyError::Signature(SignatureError::Invalid))
        ));
    }

    #[test]
    fn uppercase_hex_is_invalid() {
        // GitHub always sends lowercase hex; the comparison is byte-exact.
        let secret = Secret::from("super-secret");
        let upper = format!("sha1={}", KNOWN_SIGNATURE[5..].to_uppercase());
        assert!(verify(&secret, &upper, b"hello-world").is_err());
    }

    #[test]
    fn non_utf8_signature_is_invalid() {
        let secret = Secret::from("super-secret");
        let mut raw = KNOWN_SIGNATURE.as_bytes().to_vec();
        raw[5] = 0xff;
        assert!(matches!(
            verify(&secret, &raw, b"hello-world"),
            Err(VerifyError::Signature(SignatureError::Invalid))
        ));
    }

    #[test]
    fn modified_payload_fails() {
        let secret = Secret::from("secret");
        let header = sign(b"original payload", b"secret");
        assert!(secret.verify(&header, b"original payload").is_ok());
        assert!(secret.verify(&header, b"modified payload").is_err());
    }

    #[test]
    fn signature_is_20_bytes() {
        assert_eq!(compute_signature(b"any payload", b"any secret").len(), 20);
    }

    #[test]
    fn format_signature_header_uses_sha1_prefix() {
        assert_eq!(format_signature_header(&[0x12, 0x34, 0xab, 0xcd]), "sha1=1234abcd");
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let rendered = format!("{:?}", Secret::from("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert_eq!(format!("{:?}", Secret::default()), "Secret(<empty>)");
    }

    proptest! {
        /// verify(S, sign(S, B), B) always succeeds.
        #[test]
        fn prop_sign_verify_roundtrip(payload: Vec<u8>, secret: Vec<u8>) {
            let header = sign(&payload, &secret);
            prop_assert!(verify(&Secret::new(secret), &header, &payload).is_ok());
        }

        /// Any single-byte change to a valid signature is rejected as a
        /// signature error.
        #[test]
        fn prop_single_byte_mutation_fails(
            payload: Vec<u8>,
            secret in prop::collection::vec(any::<u8>(), 1..64),
            index in 0usize..45,
            replacement in proptest::char::range('!', '~'),
        ) {
            let header = sign(&payload, &secret);
            let mut bytes = header.into_bytes();
            prop_assume!(bytes[index] != replacement as u8);
            bytes[index] = replacement as u8;
            let mutated = String::from_utf8(bytes).unwrap();

            let result = verify(&Secret::new(secret), &mutated, &payload);
            prop_assert!(matches!(
                result,
                Err(VerifyError::Signature(SignatureError::Invalid))
            ));
        }

        /// The empty secret accepts any signature.
        #[test]
        fn prop_empty_secret_accepts_anything(signature: String, payload: Vec<u8>) {
            prop_assert!(verify(&Secret::default(), &signature, &payload).is_ok());
        }

        /// Signing with one secret and verifying with another fails.
        #[test]
        fn prop_wrong_secret_fails(
            payload: Vec<u8>,
            secret1: Vec<u8>,
            secret2 in prop::collection::vec(any::<u8>(), 1..64),
        ) {
            // HMAC zero-pads short keys, so "k" and "k\0" are the same key.
            let trim = |s: &[u8]| s.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            prop_assume!(secret1[..trim(&secret1)] != secret2[..trim(&secret2)]);
            let header = sign(&payload, &secret1);
            prop_assert!(verify(&Secret::new(secret2), &header, &payload).is_err());
        }

        /// Arbitrary header values never panic.
        #[test]
        fn prop_malformed_header_no_panic(header: String, payload: Vec<u8>, secret: Vec<u8>) {
            let _ = verify(&Secret::new(secret), &header, &payload);
        }
    }
}
