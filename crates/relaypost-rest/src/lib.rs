//! # Relaypost REST
//!
//! Internal REST API layer using Axum. Exposes signed endpoints for job
//! submission, job status, and the retry sweep, plus open health probes.

pub mod controllers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use chrono::{DateTime, Utc};
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use relaypost_config::ServerConfig;
    use relaypost_core::{
        CorrelationId, JobId, JobStatus, Platform, PublishJob, RelayError, RelayResult, UserId,
    };
    use relaypost_dispatch::{
        BackoffPolicy, DispatchQueue, GateFlags, PlatformRouter, PublishAdapter, PublishFailure,
        PublishReceipt, RetrySweeper, SafetyGate,
    };
    use relaypost_security::{sign_request, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use relaypost_store::{InsertOutcome, JobStore, ReadinessProbe};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-at-least-thirty-two-chars";

    /// Minimal in-memory store for handler tests.
    #[derive(Default)]
    struct TestStore {
        jobs: Mutex<HashMap<JobId, PublishJob>>,
    }

    #[async_trait]
    impl JobStore for TestStore {
        async fn insert(&self, job: &PublishJob) -> RelayResult<InsertOutcome> {
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
            Ok(self.jobs.lock().get(&id).cloned())
        }

        async fn find_by_idempotency_key(&self, key: &str) -> RelayResult<Option<PublishJob>> {
            Ok(self
                .jobs
                .lock()
                .values()
                .find(|j| j.idempotency_key == key)
                .cloned())
        }

        async fn mark_dispatched(&self, _id: JobId) -> RelayResult<()> {
            Ok(())
        }

        async fn mark_succeeded(&self, _id: JobId) -> RelayResult<()> {
            Ok(())
        }

        async fn mark_failed(
            &self,
            _id: JobId,
            _retry_count: u32,
            _next_retry_at: DateTime<Utc>,
            _error_log: &str,
        ) -> RelayResult<()> {
            Ok(())
        }

        async fn mark_exhausted(
            &self,
            _id: JobId,
            _retry_count: u32,
            _error_log: &str,
        ) -> RelayResult<()> {
            Ok(())
        }

        async fn find_failed_retryable(
            &self,
            _now: DateTime<Utc>,
            _max_attempts: u32,
            _limit: u32,
        ) -> RelayResult<Vec<PublishJob>> {
            Ok(Vec::new())
        }

        async fn cas_requeue(
            &self,
            _id: JobId,
            _expected_retry_count: u32,
            _next_retry_at: Option<DateTime<Utc>>,
        ) -> RelayResult<bool> {
            Ok(false)
        }

        async fn count_succeeded_since(
            &self,
            _user_id: UserId,
            _platform: Platform,
            _since: DateTime<Utc>,
        ) -> RelayResult<u64> {
            Ok(0)
        }
    }

    struct NoopAdapter;

    #[async_trait]
    impl PublishAdapter for NoopAdapter {
        fn platform(&self) -> Platform {
            Platform::Mastodon
        }

        async fn publish(&self, _job: &PublishJob) -> Result<PublishReceipt, PublishFailure> {
            Ok(PublishReceipt::new(None))
        }
    }

    /// Readiness double with a fixed verdict.
    struct StaticProbe {
        healthy: bool,
    }

    #[async_trait]
    impl ReadinessProbe for StaticProbe {
        async fn ready(&self) -> RelayResult<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(RelayError::database("connection refused"))
            }
        }
    }

    fn app() -> (Router, Arc<TestStore>) {
        app_with_probe(true)
    }

    fn app_with_probe(healthy: bool) -> (Router, Arc<TestStore>) {
        let store = Arc::new(TestStore::default());
        let gate = Arc::new(SafetyGate::new(
            store.clone(),
            GateFlags {
                scheduling_enabled: true,
                auto_publish_enabled: true,
                connectors_enabled: true,
            },
            HashMap::new(),
            100,
        ));
        let platform_router = Arc::new(
            PlatformRouter::new(Duration::from_secs(5)).with_adapter(Arc::new(NoopAdapter)),
        );
        let policy = BackoffPolicy::new(5, Duration::from_secs(10), Duration::from_secs(900));
        let (queue, handle) =
            DispatchQueue::new(store.clone(), gate, platform_router, policy, 16);
        tokio::spawn(queue.run());
        let sweeper = Arc::new(RetrySweeper::new(
            store.clone(),
            handle.clone(),
            policy,
            100,
        ));

        let state = AppState::new(handle, store.clone(), sweeper);
        let verifier = Arc::new(SignatureVerifier::new(SECRET, Duration::from_secs(300)));
        let probe = Arc::new(StaticProbe { healthy });
        let router = create_router(state, verifier, probe, &ServerConfig::default());
        (router, store)
    }

    fn signed_post(uri: &str, body: Value) -> Request<Body> {
        let body = body.to_string();
        let timestamp = Utc::now().timestamp();
        let signature = sign_request(SECRET, timestamp, body.as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .body(Body::from(body))
            .unwrap()
    }

    fn signed_get(uri: &str) -> Request<Body> {
        let timestamp = Utc::now().timestamp();
        let signature = sign_request(SECRET, timestamp, b"");
        Request::builder()
            .method("GET")
            .uri(uri)
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn submit_body() -> Value {
        json!({
            "user_id": UserId::new(),
            "correlation_id": "artifact-1",
            "platform": "mastodon",
            "payload": {"text": "hello"},
            "idempotency_key": null,
            "scheduled_time": null,
        })
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let (router, _) = app();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_passes_with_healthy_store() {
        let (router, _) = app();
        let response = router
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_fails_when_store_is_down() {
        let (router, _) = app_with_probe(false);
        let response = router
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_signed_submit_accepts_job() {
        let (router, store) = app();
        let response = router
            .oneshot(signed_post("/internal/v1/jobs", submit_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["accepted"], json!(true));
        assert_eq!(body["data"]["duplicate"], json!(false));

        let job_id = JobId::parse(body["data"]["job_id"].as_str().unwrap()).unwrap();
        let job = store.find_by_id(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_unsigned_submit_is_401_and_writes_nothing() {
        let (router, store) = app();
        let body = submit_body().to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/internal/v1/jobs")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains(SIGNATURE_HEADER), "{message}");
        assert!(store.jobs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_tampered_body_is_401() {
        let (router, _) = app();
        let timestamp = Utc::now().timestamp();
        let signature = sign_request(SECRET, timestamp, b"{}");
        let request = Request::builder()
            .method("POST")
            .uri("/internal/v1/jobs")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .body(Body::from(submit_body().to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_job_roundtrip() {
        let (router, store) = app();
        let job = PublishJob::new(
            UserId::new(),
            CorrelationId::new("artifact-9"),
            Platform::Linkedin,
            json!({"text": "posted"}),
            "k".repeat(64),
        );
        let job_id = job.id;
        store.insert(&job).await.unwrap();

        let response = router
            .oneshot(signed_get(&format!("/internal/v1/jobs/{}", job_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["data"]["platform"], json!("linkedin"));
        assert_eq!(body["data"]["status"], json!("pending"));
    }

    #[tokio::test]
    async fn test_get_unknown_job_is_404() {
        let (router, _) = app();
        let response = router
            .oneshot(signed_get(&format!(
                "/internal/v1/jobs/{}",
                uuid::Uuid::new_v4()
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sweep_endpoint_reports_counts() {
        let (router, _) = app();
        let response = router
            .oneshot(signed_post("/internal/v1/retry-sweep", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["data"]["scanned"], json!(0));
        assert_eq!(body["data"]["requeued"], json!(0));
        assert_eq!(body["data"]["exhausted"], json!(0));
    }

    #[tokio::test]
    async fn test_malformed_platform_is_400() {
        let (router, _) = app();
        let mut body = submit_body();
        body["platform"] = json!("myspace");
        let response = router
            .oneshot(signed_post("/internal/v1/jobs", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_missing_field_is_400_in_envelope() {
        let (router, store) = app();
        let mut body = submit_body();
        body.as_object_mut().unwrap().remove("platform");
        let response = router
            .oneshot(signed_post("/internal/v1/jobs", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
        assert!(store.jobs.lock().is_empty());
    }
}
