//! HTTP middleware.

mod signature;

pub use signature::{verify_signature, SignatureState};
