//! Durable job store contract.
//!
//! The store is the only resource shared across processes; all
//! cross-process coordination flows through it, most importantly the
//! compare-and-swap requeue used by overlapping recovery sweeps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaypost_core::{JobId, Platform, PublishJob, RelayResult, UserId};

/// Outcome of inserting a job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row created.
    Created,
    /// The idempotency key already exists; no row was created.
    DuplicateKey,
}

/// Persistence contract for publish jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new pending job. A unique-index violation on the
    /// idempotency key reports `DuplicateKey` instead of erroring.
    async fn insert(&self, job: &PublishJob) -> RelayResult<InsertOutcome>;

    /// Finds a job by ID.
    async fn find_by_id(&self, id: JobId) -> RelayResult<Option<PublishJob>>;

    /// Finds a job by idempotency key.
    async fn find_by_idempotency_key(&self, key: &str) -> RelayResult<Option<PublishJob>>;

    /// Transitions a pending job to `dispatched`.
    async fn mark_dispatched(&self, id: JobId) -> RelayResult<()>;

    /// Transitions a dispatched job to `succeeded` (terminal).
    async fn mark_succeeded(&self, id: JobId) -> RelayResult<()>;

    /// Records a failed attempt: status `failed`, updated retry count,
    /// the next-eligible-retry time, and the failure detail.
    async fn mark_failed(
        &self,
        id: JobId,
        retry_count: u32,
        next_retry_at: DateTime<Utc>,
        error_log: &str,
    ) -> RelayResult<()>;

    /// Transitions a job to `exhausted` (terminal); clears `next_retry_at`.
    async fn mark_exhausted(&self, id: JobId, retry_count: u32, error_log: &str)
        -> RelayResult<()>;

    /// Returns failed jobs eligible for requeue: `status = failed`,
    /// `retry_count < max_attempts`, and `next_retry_at` null or past.
    async fn find_failed_retryable(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
        limit: u32,
    ) -> RelayResult<Vec<PublishJob>>;

    /// Conditionally flips a failed job back to `pending` for re-dispatch.
    ///
    /// The update only succeeds if the row still matches
    /// `expected_retry_count` and is still `failed`; of two concurrent
    /// sweeps, exactly one observes `true`.
    async fn cas_requeue(
        &self,
        id: JobId,
        expected_retry_count: u32,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> RelayResult<bool>;

    /// Counts succeeded publishes for `(user, platform)` since the given
    /// instant; drives the ban-risk rolling window.
    async fn count_succeeded_since(
        &self,
        user_id: UserId,
        platform: Platform,
        since: DateTime<Utc>,
    ) -> RelayResult<u64>;
}

/// Backing-infrastructure probe for the readiness endpoint.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Errors when the backing store cannot serve requests.
    async fn ready(&self) -> RelayResult<()>;
}
