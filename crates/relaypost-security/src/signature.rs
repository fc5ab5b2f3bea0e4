//! HMAC-SHA256 signature creation and verification.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex digest, prefixed `sha256=`.
pub const SIGNATURE_HEADER: &str = "x-relaypost-signature";
/// Header carrying the signing timestamp in unix seconds.
pub const TIMESTAMP_HEADER: &str = "x-relaypost-timestamp";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Why a signature was rejected. Every variant maps to a 401.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing {SIGNATURE_HEADER} header")]
    MissingSignature,
    #[error("missing {TIMESTAMP_HEADER} header")]
    MissingTimestamp,
    #[error("unparsable timestamp")]
    BadTimestamp,
    #[error("timestamp outside the allowed window")]
    StaleTimestamp,
    #[error("malformed signature header")]
    MalformedSignature,
    #[error("signature mismatch")]
    Mismatch,
}

/// Signs a request body for the internal API.
///
/// Returns the signature header value; the caller sends `timestamp` in the
/// timestamp header unchanged.
#[must_use]
pub fn sign_request(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Verifies internal request signatures against a shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    max_age: Duration,
}

impl SignatureVerifier {
    #[must_use]
    pub fn new(secret: impl Into<String>, max_age: Duration) -> Self {
        Self {
            secret: secret.into(),
            max_age,
        }
    }

    /// Verifies one request. Header values arrive as the middleware read
    /// them; `None` means the header was absent.
    pub fn verify(
        &self,
        signature_header: Option<&str>,
        timestamp_header: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        let signature = signature_header.ok_or(SignatureError::MissingSignature)?;
        let timestamp = timestamp_header.ok_or(SignatureError::MissingTimestamp)?;

        let timestamp: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::BadTimestamp)?;

        let age = (Utc::now().timestamp() - timestamp).unsigned_abs();
        if age > self.max_age.as_secs() {
            return Err(SignatureError::StaleTimestamp);
        }

        let hex_digest = signature
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or(SignatureError::MalformedSignature)?;
        let digest = hex::decode(hex_digest).map_err(|_| SignatureError::MalformedSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        mac.verify_slice(&digest)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-at-least-thirty-two-chars";

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SECRET, Duration::from_secs(300))
    }

    #[test]
    fn test_signed_request_verifies() {
        let timestamp = Utc::now().timestamp();
        let body = br#"{"platform":"linkedin"}"#;
        let signature = sign_request(SECRET, timestamp, body);

        assert_eq!(
            verifier().verify(Some(&signature), Some(&timestamp.to_string()), body),
            Ok(())
        );
    }

    #[test]
    fn test_missing_signature_header() {
        let timestamp = Utc::now().timestamp().to_string();
        assert_eq!(
            verifier().verify(None, Some(&timestamp), b"{}"),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn test_missing_timestamp_header() {
        let signature = sign_request(SECRET, Utc::now().timestamp(), b"{}");
        assert_eq!(
            verifier().verify(Some(&signature), None, b"{}"),
            Err(SignatureError::MissingTimestamp)
        );
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let timestamp = Utc::now().timestamp();
        let signature = sign_request(SECRET, timestamp, b"original");
        assert_eq!(
            verifier().verify(Some(&signature), Some(&timestamp.to_string()), b"tampered"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let timestamp = Utc::now().timestamp();
        let signature = sign_request("other-secret", timestamp, b"{}");
        assert_eq!(
            verifier().verify(Some(&signature), Some(&timestamp.to_string()), b"{}"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let timestamp = Utc::now().timestamp() - 3600;
        let signature = sign_request(SECRET, timestamp, b"{}");
        assert_eq!(
            verifier().verify(Some(&signature), Some(&timestamp.to_string()), b"{}"),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn test_future_timestamp_beyond_window_is_rejected() {
        let timestamp = Utc::now().timestamp() + 3600;
        let signature = sign_request(SECRET, timestamp, b"{}");
        assert_eq!(
            verifier().verify(Some(&signature), Some(&timestamp.to_string()), b"{}"),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn test_signature_without_prefix_is_malformed() {
        let timestamp = Utc::now().timestamp();
        let signature = sign_request(SECRET, timestamp, b"{}");
        let bare = signature.strip_prefix("sha256=").unwrap();
        assert_eq!(
            verifier().verify(Some(bare), Some(&timestamp.to_string()), b"{}"),
            Err(SignatureError::MalformedSignature)
        );
    }

    #[test]
    fn test_unparsable_timestamp_is_rejected() {
        let signature = sign_request(SECRET, 0, b"{}");
        assert_eq!(
            verifier().verify(Some(&signature), Some("yesterday"), b"{}"),
            Err(SignatureError::BadTimestamp)
        );
    }

    #[test]
    fn test_timestamp_swap_is_rejected() {
        // A valid signature for one timestamp cannot be replayed under another.
        let t1 = Utc::now().timestamp();
        let t2 = t1 + 1;
        let signature = sign_request(SECRET, t1, b"{}");
        assert_eq!(
            verifier().verify(Some(&signature), Some(&t2.to_string()), b"{}"),
            Err(SignatureError::Mismatch)
        );
    }
}
