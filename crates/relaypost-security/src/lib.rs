//! # Relaypost Security
//!
//! HMAC-SHA256 request signing for the internal API. Callers sign
//! `"{timestamp}.{body}"` with the shared secret and send
//! `x-relaypost-signature: sha256=<hex>` plus `x-relaypost-timestamp`
//! (unix seconds). Verification is constant-time and bounded by a
//! configurable maximum age to keep replays short-lived.

pub mod signature;

pub use signature::{sign_request, SignatureError, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
