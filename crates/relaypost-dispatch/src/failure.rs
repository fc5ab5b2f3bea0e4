//! Failure classification for publish attempts.
//!
//! Retryability is decided by an enumerated kind, never by matching on
//! message text. The classified failure is what gets persisted in the
//! job's error log, so the recovery sweep can re-read the kind later.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error;

/// What went wrong with a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, DNS failure, broken pipe.
    Network,
    /// The attempt exceeded the dispatch timeout.
    Timeout,
    /// Platform answered 429.
    RateLimited,
    /// Platform answered 5xx.
    ServerError,
    /// Credentials rejected (401/403).
    AuthRejected,
    /// Platform rejected the content itself (400/422).
    PayloadRejected,
    /// No adapter registered for the platform.
    UnsupportedPlatform,
}

impl FailureKind {
    /// Whether a later attempt could plausibly succeed.
    ///
    /// Auth and payload rejections are permanent; resubmitting the same
    /// bytes with the same credentials cannot change the outcome.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            FailureKind::Network
            | FailureKind::Timeout
            | FailureKind::RateLimited
            | FailureKind::ServerError => true,
            FailureKind::AuthRejected
            | FailureKind::PayloadRejected
            | FailureKind::UnsupportedPlatform => false,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ServerError => "server_error",
            FailureKind::AuthRejected => "auth_rejected",
            FailureKind::PayloadRejected => "payload_rejected",
            FailureKind::UnsupportedPlatform => "unsupported_platform",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified publish failure, persisted as JSON in the job's error log.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct PublishFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl PublishFailure {
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether a later attempt could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Serializes for the job's error log column.
    #[must_use]
    pub fn to_log(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"kind":"{}","message":""}}"#, self.kind)
        })
    }

    /// Reads a failure back out of a persisted error log.
    ///
    /// Rows written before the classifier existed (or hand-edited ones)
    /// may not parse; callers treat those as retryable unknowns.
    #[must_use]
    pub fn from_log(log: &str) -> Option<Self> {
        serde_json::from_str(log).ok()
    }
}
