//! Deterministic idempotency keys for publish jobs.

use relaypost_core::{CorrelationId, Platform};
use sha2::{Digest, Sha256};

/// Builds the idempotency key for a publish request.
///
/// The key is SHA-256 over the correlation ID, the platform name, and the
/// canonical JSON encoding of the payload, with a length-prefixed frame so
/// adjacent fields cannot collide. The same logical request always maps to
/// the same key, across processes and restarts.
#[must_use]
pub fn idempotency_key(
    correlation_id: &CorrelationId,
    platform: Platform,
    payload: &serde_json::Value,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        correlation_id.as_str().as_bytes(),
        platform.as_str().as_bytes(),
        payload.to_string().as_bytes(),
    ] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}
