//! Shared doubles for queue and sweep tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relaypost_core::{JobId, JobStatus, Platform, PublishJob, RelayError, RelayResult, UserId};
use relaypost_store::{InsertOutcome, JobStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::failure::PublishFailure;
use crate::router::{PublishAdapter, PublishReceipt};

/// In-memory store with the same status guards as the MySQL implementation.
#[derive(Default)]
pub struct InMemoryStore {
    jobs: Mutex<HashMap<JobId, PublishJob>>,
    /// When set, every call fails with a database error.
    pub poisoned: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, id: JobId) -> Option<PublishJob> {
        self.jobs.lock().get(&id).cloned()
    }

    pub fn put(&self, job: PublishJob) {
        self.jobs.lock().insert(job.id, job);
    }

    fn check_poison(&self) -> RelayResult<()> {
        if *self.poisoned.lock() {
            return Err(RelayError::database("store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn insert(&self, job: &PublishJob) -> RelayResult<InsertOutcome> {
        self.check_poison()?;
        let mut jobs = self.jobs.lock();
        if jobs
            .values()
            .any(|j| j.idempotency_key == job.idempotency_key)
        {
            return Ok(InsertOutcome::DuplicateKey);
        }
        jobs.insert(job.id, job.clone());
        Ok(InsertOutcome::Created)
    }

    async fn find_by_id(&self, id: JobId) -> RelayResult<Option<PublishJob>> {
        self.check_poison()?;
        Ok(self.jobs.lock().get(&id).cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> RelayResult<Option<PublishJob>> {
        self.check_poison()?;
        Ok(self
            .jobs
            .lock()
            .values()
            .find(|j| j.idempotency_key == key)
            .cloned())
    }

    async fn mark_dispatched(&self, id: JobId) -> RelayResult<()> {
        self.check_poison()?;
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Dispatched;
                Ok(())
            }
            _ => Err(RelayError::Conflict(format!("job {} is not pending", id))),
        }
    }

    async fn mark_succeeded(&self, id: JobId) -> RelayResult<()> {
        self.check_poison()?;
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Dispatched => {
                job.status = JobStatus::Succeeded;
                job.next_retry_at = None;
                Ok(())
            }
            _ => Err(RelayError::Conflict(format!("job {} is not dispatched", id))),
        }
    }

    async fn mark_failed(
        &self,
        id: JobId,
        retry_count: u32,
        next_retry_at: DateTime<Utc>,
        error_log: &str,
    ) -> RelayResult<()> {
        self.check_poison()?;
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Dispatched => {
                job.status = JobStatus::Failed;
                job.retry_count = retry_count;
                job.next_retry_at = Some(next_retry_at);
                job.error_log = Some(error_log.to_string());
                Ok(())
            }
            _ => Err(RelayError::Conflict(format!("job {} is not dispatched", id))),
        }
    }

    async fn mark_exhausted(
        &self,
        id: JobId,
        retry_count: u32,
        error_log: &str,
    ) -> RelayResult<()> {
        self.check_poison()?;
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(&id) {
            Some(job) if matches!(job.status, JobStatus::Dispatched | JobStatus::Failed) => {
                job.status = JobStatus::Exhausted;
                job.retry_count = retry_count;
                job.next_retry_at = None;
                job.error_log = Some(error_log.to_string());
                Ok(())
            }
            _ => Err(RelayError::Conflict(format!(
                "job {} is terminal or missing",
                id
            ))),
        }
    }

    async fn find_failed_retryable(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
        limit: u32,
    ) -> RelayResult<Vec<PublishJob>> {
        self.check_poison()?;
        let jobs = self.jobs.lock();
        let mut eligible: Vec<PublishJob> = jobs
            .values()
            .filter(|j| j.status == JobStatus::Failed)
            .filter(|j| j.retry_count < max_attempts)
            .filter(|j| j.next_retry_at.map_or(true, |at| at <= now))
            .cloned()
            .collect();
        eligible.sort_by_key(|j| j.next_retry_at);
        eligible.truncate(limit as usize);
        Ok(eligible)
    }

    async fn cas_requeue(
        &self,
        id: JobId,
        expected_retry_count: u32,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> RelayResult<bool> {
        self.check_poison()?;
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(&id) {
            Some(job)
                if job.status == JobStatus::Failed && job.retry_count == expected_retry_count =>
            {
                job.status = JobStatus::Pending;
                job.next_retry_at = next_retry_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_succeeded_since(
        &self,
        user_id: UserId,
        platform: Platform,
        since: DateTime<Utc>,
    ) -> RelayResult<u64> {
        self.check_poison()?;
        Ok(self
            .jobs
            .lock()
            .values()
            .filter(|j| {
                j.user_id == user_id
                    && j.platform == platform
                    && j.status == JobStatus::Succeeded
                    && j.created_at >= since
            })
            .count() as u64)
    }
}

/// Adapter double that counts attempts and replays scripted results.
pub struct ScriptedAdapter {
    platform: Platform,
    results: Mutex<Vec<Result<PublishReceipt, PublishFailure>>>,
    pub attempts: AtomicU32,
}

impl ScriptedAdapter {
    /// Results are consumed front to back; the last one repeats.
    pub fn new(
        platform: Platform,
        results: Vec<Result<PublishReceipt, PublishFailure>>,
    ) -> Arc<Self> {
        assert!(!results.is_empty());
        Arc::new(Self {
            platform,
            results: Mutex::new(results),
            attempts: AtomicU32::new(0),
        })
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublishAdapter for ScriptedAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn publish(&self, _job: &PublishJob) -> Result<PublishReceipt, PublishFailure> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut results = self.results.lock();
        if results.len() > 1 {
            results.remove(0)
        } else {
            results[0].clone()
        }
    }
}
