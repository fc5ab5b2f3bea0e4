//! Publish job submission and status controller.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use relaypost_core::{JobId, PublishJob, RelayError};
use relaypost_dispatch::{SubmitOutcome, SubmitRequest};
use serde::Serialize;
use uuid::Uuid;

use crate::responses::{ok, ApiJson, ApiResult};
use crate::state::AppState;

/// Row view returned by the status endpoint.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: JobId,
    pub correlation_id: String,
    pub user_id: String,
    pub platform: String,
    pub status: String,
    pub retry_count: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub error_log: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PublishJob> for JobResponse {
    fn from(job: PublishJob) -> Self {
        Self {
            id: job.id,
            correlation_id: job.correlation_id.to_string(),
            user_id: job.user_id.to_string(),
            platform: job.platform.to_string(),
            status: job.status.to_string(),
            retry_count: job.retry_count,
            next_retry_at: job.next_retry_at,
            error_log: job.error_log,
            scheduled_time: job.scheduled_time,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Creates the jobs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/:id", get(get_job))
}

/// Accepts one publish submission.
///
/// Policy rejections and duplicates come back as a 200 with the outcome
/// flags set; only malformed input and infrastructure failures are errors.
pub async fn submit_job(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubmitRequest>,
) -> ApiResult<SubmitOutcome> {
    let outcome = state.queue.submit(request).await?;
    ok(outcome)
}

/// Returns the stored state of one job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<JobResponse> {
    let job = state
        .store
        .find_by_id(JobId::from_uuid(id))
        .await?
        .ok_or_else(|| RelayError::not_found("publish_job", id))?;
    ok(JobResponse::from(job))
}
