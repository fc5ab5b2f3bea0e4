//! In-process dispatch queue.
//!
//! One channel, one consumer. The consumer takes jobs in submission order
//! and keeps exactly one delivery in flight; it never retries inline.
//! Failed jobs wait in the store for the recovery sweep.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use relaypost_core::{
    CorrelationId, JobId, Platform, PublishJob, RelayError, RelayResult, UserId,
};
use relaypost_store::{InsertOutcome, JobStore};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::backoff::BackoffPolicy;
use crate::gate::{GateDecision, SafetyGate};
use crate::idempotency::idempotency_key;
use crate::metrics::DispatchMetrics;
use crate::router::PlatformRouter;

/// A publish submission, before it becomes a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub user_id: UserId,
    pub correlation_id: CorrelationId,
    pub platform: Platform,
    pub payload: serde_json::Value,
    /// Optional caller-supplied key; must match the derived one.
    pub idempotency_key: Option<String>,
    /// When the upstream scheduler decided this publish should go out.
    /// Recorded on the row for auditing; dispatch itself is immediate,
    /// the caller submits at the due time.
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub accepted: bool,
    pub job_id: Option<JobId>,
    pub duplicate: bool,
    pub reason: Option<String>,
}

impl SubmitOutcome {
    fn accepted(job_id: JobId) -> Self {
        Self {
            accepted: true,
            job_id: Some(job_id),
            duplicate: false,
            reason: None,
        }
    }

    fn duplicate(job_id: Option<JobId>) -> Self {
        Self {
            accepted: true,
            job_id,
            duplicate: true,
            reason: None,
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            accepted: false,
            job_id: None,
            duplicate: false,
            reason: Some(reason),
        }
    }
}

/// Bounded set of recently accepted idempotency keys.
///
/// Cuts the common duplicate off before the database round trip; the
/// unique index remains the authority.
struct RecentKeys {
    order: VecDeque<String>,
    set: HashSet<String>,
    capacity: usize,
}

impl RecentKeys {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            set: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.set.contains(key)
    }

    fn insert(&mut self, key: String) {
        if self.set.contains(&key) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.set.remove(&evicted);
            }
        }
        self.order.push_back(key.clone());
        self.set.insert(key);
    }
}

/// Cloneable submission side of the queue.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<PublishJob>,
    store: Arc<dyn JobStore>,
    gate: Arc<SafetyGate>,
    recent_keys: Arc<Mutex<RecentKeys>>,
}

impl QueueHandle {
    /// Admits one publish submission.
    ///
    /// The job row is written `pending` before it enters the channel, so a
    /// crash between the two leaves a recoverable row rather than a lost
    /// acknowledgement.
    pub async fn submit(&self, request: SubmitRequest) -> RelayResult<SubmitOutcome> {
        let derived = idempotency_key(&request.correlation_id, request.platform, &request.payload);
        let key = match request.idempotency_key {
            Some(supplied) if supplied != derived => {
                return Err(RelayError::validation(format!(
                    "idempotency key does not match request contents: expected {}",
                    derived
                )));
            }
            Some(supplied) => supplied,
            None => derived,
        };

        if let GateDecision::Rejected { reason } =
            self.gate.check(request.user_id, request.platform).await
        {
            DispatchMetrics::job_gate_rejected(request.platform.as_str());
            info!(platform = %request.platform, reason = %reason, "publish rejected by gate");
            return Ok(SubmitOutcome::rejected(reason));
        }

        if self.recent_keys.lock().contains(&key) {
            DispatchMetrics::job_duplicate(request.platform.as_str());
            let existing = self.store.find_by_idempotency_key(&key).await?;
            return Ok(SubmitOutcome::duplicate(existing.map(|j| j.id)));
        }

        let mut job = PublishJob::new(
            request.user_id,
            request.correlation_id,
            request.platform,
            request.payload,
            key.clone(),
        );
        if let Some(at) = request.scheduled_time {
            job = job.with_scheduled_time(at);
        }

        match self.store.insert(&job).await? {
            InsertOutcome::DuplicateKey => {
                DispatchMetrics::job_duplicate(request.platform.as_str());
                let existing = self.store.find_by_idempotency_key(&key).await?;
                Ok(SubmitOutcome::duplicate(existing.map(|j| j.id)))
            }
            InsertOutcome::Created => {
                self.recent_keys.lock().insert(key);
                let job_id = job.id;
                let platform = job.platform;
                self.tx
                    .send(job)
                    .await
                    .map_err(|_| RelayError::internal("dispatch queue is closed"))?;
                DispatchMetrics::job_enqueued(platform.as_str());
                DispatchMetrics::queue_depth(self.tx.max_capacity() - self.tx.capacity());
                Ok(SubmitOutcome::accepted(job_id))
            }
        }
    }

    /// Re-admits a job the recovery sweep already flipped back to pending.
    ///
    /// Skips the gate and the duplicate check; the row exists.
    pub async fn requeue(&self, job: PublishJob) -> RelayResult<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| RelayError::internal("dispatch queue is closed"))
    }
}

/// Consumer side of the queue. Owns the channel receiver.
pub struct DispatchQueue {
    rx: mpsc::Receiver<PublishJob>,
    store: Arc<dyn JobStore>,
    router: Arc<PlatformRouter>,
    policy: BackoffPolicy,
}

impl DispatchQueue {
    /// Builds the queue and its submission handle.
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        gate: Arc<SafetyGate>,
        router: Arc<PlatformRouter>,
        policy: BackoffPolicy,
        capacity: usize,
    ) -> (Self, QueueHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = QueueHandle {
            tx,
            store: Arc::clone(&store),
            gate,
            recent_keys: Arc::new(Mutex::new(RecentKeys::new(capacity.max(1024)))),
        };
        let queue = Self {
            rx,
            store,
            router,
            policy,
        };
        (queue, handle)
    }

    /// Runs the consumer loop until every handle is dropped.
    ///
    /// One job's failure never kills the loop.
    pub async fn run(mut self) {
        info!("dispatch queue consumer started");
        while let Some(job) = self.rx.recv().await {
            let job_id = job.id;
            if let Err(e) = self.process(job).await {
                error!(job_id = %job_id, error = %e, "dispatch bookkeeping failed");
            }
        }
        info!("dispatch queue consumer stopped");
    }

    async fn process(&self, job: PublishJob) -> RelayResult<()> {
        self.store.mark_dispatched(job.id).await?;
        DispatchMetrics::job_dispatched(job.platform.as_str());

        let started = Instant::now();
        match self.router.dispatch(&job).await {
            Ok(receipt) => {
                self.store.mark_succeeded(job.id).await?;
                DispatchMetrics::job_succeeded(job.platform.as_str(), started.elapsed());
                debug!(
                    job_id = %job.id,
                    platform = %job.platform,
                    remote_id = receipt.remote_id.as_deref().unwrap_or(""),
                    "publish succeeded"
                );
                Ok(())
            }
            Err(failure) => {
                let failed_attempts = job.retry_count + 1;
                DispatchMetrics::job_failed(
                    job.platform.as_str(),
                    failure.kind.as_str(),
                    started.elapsed(),
                );

                if self.policy.should_retry(failed_attempts, &failure) {
                    let delay = self.policy.delay_for_attempt(failed_attempts);
                    let next_retry_at = Utc::now()
                        + ChronoDuration::seconds(i64::try_from(delay.as_secs()).unwrap_or(i64::MAX));
                    warn!(
                        job_id = %job.id,
                        platform = %job.platform,
                        attempt = failed_attempts,
                        kind = %failure.kind,
                        retry_in_secs = delay.as_secs(),
                        "publish attempt failed, awaiting sweep"
                    );
                    self.store
                        .mark_failed(job.id, failed_attempts, next_retry_at, &failure.to_log())
                        .await
                } else {
                    warn!(
                        job_id = %job.id,
                        platform = %job.platform,
                        attempt = failed_attempts,
                        kind = %failure.kind,
                        "publish attempts exhausted"
                    );
                    DispatchMetrics::job_exhausted(job.platform.as_str());
                    self.store
                        .mark_exhausted(job.id, failed_attempts, &failure.to_log())
                        .await
                }
            }
        }
    }
}
