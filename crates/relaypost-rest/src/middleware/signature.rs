//! Request signature middleware.
//!
//! Every internal endpoint requires a valid HMAC signature. The body has
//! to be buffered to verify the digest, then handed back to the handler.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use relaypost_core::RelayError;
use relaypost_security::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use std::sync::Arc;
use tracing::debug;

use crate::responses::AppError;

/// Signature middleware state.
#[derive(Clone)]
pub struct SignatureState {
    pub verifier: Arc<SignatureVerifier>,
    /// Upper bound on buffered request bodies.
    pub max_body_size: usize,
}

impl SignatureState {
    #[must_use]
    pub fn new(verifier: Arc<SignatureVerifier>, max_body_size: usize) -> Self {
        Self {
            verifier,
            max_body_size,
        }
    }
}

/// Verifies the request signature; a failure is always a hard 401.
pub async fn verify_signature(
    State(state): State<SignatureState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError(RelayError::validation(format!("unreadable body: {}", e)))
                .into_response();
        }
    };

    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let timestamp = parts
        .headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = state.verifier.verify(signature, timestamp, &bytes) {
        debug!(uri = %parts.uri, error = %e, "rejecting unsigned request");
        return AppError(RelayError::Unauthorized(e.to_string())).into_response();
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}
