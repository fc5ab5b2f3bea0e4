//! Prometheus metrics for the dispatch pipeline.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names for the dispatch pipeline.
pub mod names {
    /// Total jobs accepted into the queue.
    pub const JOBS_ENQUEUED_TOTAL: &str = "relaypost_jobs_enqueued_total";
    /// Total duplicate submissions suppressed.
    pub const JOBS_DUPLICATE_TOTAL: &str = "relaypost_jobs_duplicate_total";
    /// Total submissions rejected by the safety gate.
    pub const JOBS_GATE_REJECTED_TOTAL: &str = "relaypost_jobs_gate_rejected_total";
    /// Total delivery attempts dispatched to adapters.
    pub const JOBS_DISPATCHED_TOTAL: &str = "relaypost_jobs_dispatched_total";
    /// Total jobs delivered.
    pub const JOBS_SUCCEEDED_TOTAL: &str = "relaypost_jobs_succeeded_total";
    /// Total failed attempts.
    pub const JOBS_FAILED_TOTAL: &str = "relaypost_jobs_failed_total";
    /// Total jobs whose retries were spent.
    pub const JOBS_EXHAUSTED_TOTAL: &str = "relaypost_jobs_exhausted_total";
    /// Total rows examined by the recovery sweep.
    pub const SWEEP_SCANNED_TOTAL: &str = "relaypost_sweep_scanned_total";
    /// Total jobs requeued by the recovery sweep.
    pub const SWEEP_REQUEUED_TOTAL: &str = "relaypost_sweep_requeued_total";
    /// Total sweep invocations.
    pub const SWEEP_RUNS_TOTAL: &str = "relaypost_sweep_runs_total";

    /// Jobs currently waiting in the channel.
    pub const QUEUE_DEPTH: &str = "relaypost_queue_depth";

    /// Adapter attempt duration in seconds.
    pub const DISPATCH_DURATION_SECONDS: &str = "relaypost_dispatch_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::JOBS_ENQUEUED_TOTAL, "Jobs accepted into the queue");
    describe_counter!(names::JOBS_DUPLICATE_TOTAL, "Duplicate submissions suppressed");
    describe_counter!(
        names::JOBS_GATE_REJECTED_TOTAL,
        "Submissions rejected by the safety gate"
    );
    describe_counter!(
        names::JOBS_DISPATCHED_TOTAL,
        "Delivery attempts dispatched to platform adapters"
    );
    describe_counter!(names::JOBS_SUCCEEDED_TOTAL, "Jobs delivered successfully");
    describe_counter!(names::JOBS_FAILED_TOTAL, "Failed delivery attempts");
    describe_counter!(names::JOBS_EXHAUSTED_TOTAL, "Jobs whose retries were spent");
    describe_counter!(
        names::SWEEP_SCANNED_TOTAL,
        "Rows examined by the recovery sweep"
    );
    describe_counter!(
        names::SWEEP_REQUEUED_TOTAL,
        "Jobs requeued by the recovery sweep"
    );
    describe_counter!(names::SWEEP_RUNS_TOTAL, "Recovery sweep invocations");
    describe_gauge!(names::QUEUE_DEPTH, "Jobs currently waiting in the channel");
    describe_histogram!(
        names::DISPATCH_DURATION_SECONDS,
        "Adapter attempt duration in seconds"
    );
}

/// Dispatch pipeline metrics recorder.
#[derive(Clone)]
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn job_enqueued(platform: &str) {
        counter!(names::JOBS_ENQUEUED_TOTAL, "platform" => platform.to_string()).increment(1);
    }

    pub fn job_duplicate(platform: &str) {
        counter!(names::JOBS_DUPLICATE_TOTAL, "platform" => platform.to_string()).increment(1);
    }

    pub fn job_gate_rejected(platform: &str) {
        counter!(names::JOBS_GATE_REJECTED_TOTAL, "platform" => platform.to_string()).increment(1);
    }

    pub fn job_dispatched(platform: &str) {
        counter!(names::JOBS_DISPATCHED_TOTAL, "platform" => platform.to_string()).increment(1);
    }

    pub fn job_succeeded(platform: &str, duration: Duration) {
        counter!(names::JOBS_SUCCEEDED_TOTAL, "platform" => platform.to_string()).increment(1);
        histogram!(
            names::DISPATCH_DURATION_SECONDS,
            "platform" => platform.to_string(),
            "status" => "succeeded"
        )
        .record(duration.as_secs_f64());
    }

    pub fn job_failed(platform: &str, kind: &str, duration: Duration) {
        counter!(
            names::JOBS_FAILED_TOTAL,
            "platform" => platform.to_string(),
            "kind" => kind.to_string()
        )
        .increment(1);
        histogram!(
            names::DISPATCH_DURATION_SECONDS,
            "platform" => platform.to_string(),
            "status" => "failed"
        )
        .record(duration.as_secs_f64());
    }

    pub fn job_exhausted(platform: &str) {
        counter!(names::JOBS_EXHAUSTED_TOTAL, "platform" => platform.to_string()).increment(1);
    }

    pub fn sweep_completed(scanned: u64, requeued: u64) {
        counter!(names::SWEEP_RUNS_TOTAL).increment(1);
        counter!(names::SWEEP_SCANNED_TOTAL).increment(scanned);
        counter!(names::SWEEP_REQUEUED_TOTAL).increment(requeued);
    }

    pub fn queue_depth(depth: usize) {
        gauge!(names::QUEUE_DEPTH).set(depth as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // Just verify registration doesn't panic
        register_metrics();
    }

    #[test]
    fn test_recorders_do_not_panic() {
        DispatchMetrics::job_enqueued("linkedin");
        DispatchMetrics::job_duplicate("linkedin");
        DispatchMetrics::job_gate_rejected("x");
        DispatchMetrics::job_dispatched("x");
        DispatchMetrics::job_succeeded("x", Duration::from_millis(120));
        DispatchMetrics::job_failed("x", "timeout", Duration::from_secs(30));
        DispatchMetrics::job_exhausted("x");
        DispatchMetrics::sweep_completed(10, 4);
        DispatchMetrics::queue_depth(3);
    }
}
