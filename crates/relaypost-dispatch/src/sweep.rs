//! Recovery sweep for failed jobs.
//!
//! Externally triggered and safe to overlap with itself: every requeue
//! goes through the store's compare-and-swap, so two sweeps observing the
//! same row admit exactly one winner.

use chrono::Utc;
use relaypost_core::RelayResult;
use relaypost_store::JobStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::failure::{FailureKind, PublishFailure};
use crate::metrics::DispatchMetrics;
use crate::queue::QueueHandle;

/// What one sweep invocation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Failed rows examined.
    pub scanned: u64,
    /// Rows flipped back to pending and re-admitted.
    pub requeued: u64,
    /// Rows whose retries were spent.
    pub exhausted: u64,
}

/// Scans failed jobs whose backoff has elapsed and requeues the eligible.
pub struct RetrySweeper {
    store: Arc<dyn JobStore>,
    queue: QueueHandle,
    policy: BackoffPolicy,
    batch_size: u32,
}

impl RetrySweeper {
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: QueueHandle,
        policy: BackoffPolicy,
        batch_size: u32,
    ) -> Self {
        Self {
            store,
            queue,
            policy,
            batch_size,
        }
    }

    /// Runs one sweep. Store errors abort the whole invocation.
    pub async fn sweep(&self) -> RelayResult<SweepReport> {
        let now = Utc::now();
        let candidates = self
            .store
            .find_failed_retryable(now, self.policy.max_attempts(), self.batch_size)
            .await?;

        let mut report = SweepReport::default();
        for job in candidates {
            report.scanned += 1;

            // Rows written before the classifier existed may not parse;
            // treat those as retryable unknowns.
            let failure = job
                .error_log
                .as_deref()
                .and_then(PublishFailure::from_log)
                .unwrap_or_else(|| {
                    PublishFailure::new(FailureKind::Network, "unclassified failure")
                });

            if !self.policy.should_retry(job.retry_count, &failure) {
                warn!(
                    job_id = %job.id,
                    platform = %job.platform,
                    retry_count = job.retry_count,
                    kind = %failure.kind,
                    "sweep exhausting job"
                );
                self.store
                    .mark_exhausted(job.id, job.retry_count, &failure.to_log())
                    .await?;
                DispatchMetrics::job_exhausted(job.platform.as_str());
                report.exhausted += 1;
                continue;
            }

            // A pending job is not awaiting retry, so the timestamp clears.
            if self.store.cas_requeue(job.id, job.retry_count, None).await? {
                let mut requeued = job;
                requeued.status = relaypost_core::JobStatus::Pending;
                requeued.next_retry_at = None;
                self.queue.requeue(requeued).await?;
                report.requeued += 1;
            } else {
                debug!(job_id = %job.id, "requeue lost the race, skipping");
            }
        }

        DispatchMetrics::sweep_completed(report.scanned, report.requeued);
        info!(
            scanned = report.scanned,
            requeued = report.requeued,
            exhausted = report.exhausted,
            "recovery sweep finished"
        );
        Ok(report)
    }
}
