//! The publish job entity and its status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::{CorrelationId, JobId, Platform, RelayError, UserId};

/// Lifecycle status of a publish job.
///
/// `pending → dispatched → {succeeded | failed}`; a `failed` job eligible
/// for retry is flipped back to `pending` by the recovery sweep; `succeeded`
/// and `exhausted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and persisted, not yet handed to the router.
    Pending,
    /// Currently in flight to a platform adapter.
    Dispatched,
    /// Delivered; terminal.
    Succeeded,
    /// Last attempt failed; awaiting the recovery sweep.
    Failed,
    /// Retries spent or failure classified permanent; terminal.
    Exhausted,
}

impl JobStatus {
    /// Returns true if no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Exhausted)
    }

    /// Returns the canonical lowercase name (persisted form).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Dispatched => "dispatched",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Exhausted => "exhausted",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Pending
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "dispatched" => Ok(JobStatus::Dispatched),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            "exhausted" => Ok(JobStatus::Exhausted),
            other => Err(RelayError::internal(format!("unknown job status: {}", other))),
        }
    }
}

/// A unit of publish work, persisted in the durable job store.
///
/// The payload is opaque at this boundary; only the platform adapter
/// interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishJob {
    /// Unique identifier, assigned at enqueue time.
    pub id: JobId,

    /// Groups per-platform jobs originating from one content artifact.
    pub correlation_id: CorrelationId,

    /// Publishing account; drives the ban-risk window.
    pub user_id: UserId,

    /// Target platform.
    pub platform: Platform,

    /// Platform-specific content body, opaque to the queue.
    pub payload: serde_json::Value,

    /// Deterministic key suppressing duplicate submission.
    pub idempotency_key: String,

    /// Current lifecycle status.
    pub status: JobStatus,

    /// Number of failed attempts so far.
    pub retry_count: u32,

    /// When the job next becomes eligible for retry; None when not
    /// awaiting retry.
    pub next_retry_at: Option<DateTime<Utc>>,

    /// Last observed failure, JSON-encoded `PublishFailure`.
    pub error_log: Option<String>,

    /// Requested publish time, if the caller scheduled one. Audit-only:
    /// the upstream scheduler submits at the due time, so dispatch never
    /// waits on this field.
    pub scheduled_time: Option<DateTime<Utc>>,

    /// Row timestamps.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PublishJob {
    /// Creates a new pending job.
    #[must_use]
    pub fn new(
        user_id: UserId,
        correlation_id: CorrelationId,
        platform: Platform,
        payload: serde_json::Value,
        idempotency_key: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            correlation_id,
            user_id,
            platform,
            payload,
            idempotency_key,
            status: JobStatus::Pending,
            retry_count: 0,
            next_retry_at: None,
            error_log: None,
            scheduled_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the requested publish time.
    #[must_use]
    pub fn with_scheduled_time(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_time = Some(at);
        self
    }

    /// The attempt number the next dispatch would be (1-based).
    #[must_use]
    pub const fn next_attempt(&self) -> u32 {
        self.retry_count + 1
    }

    /// Returns true if no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
