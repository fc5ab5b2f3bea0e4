//! MySQL job store implementation.

use crate::pool::DatabasePool;
use crate::traits::{InsertOutcome, JobStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaypost_core::{
    CorrelationId, JobId, JobStatus, Platform, PublishJob, RelayError, RelayResult, UserId,
};
use sqlx::types::Json;
use sqlx::FromRow;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// MySQL job store implementation.
#[derive(Clone)]
pub struct MySqlJobStore {
    pool: Arc<DatabasePool>,
}

impl MySqlJobStore {
    /// Creates a new MySQL job store.
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a publish job.
#[derive(Debug, FromRow)]
struct JobRow {
    id: String, // MySQL stores UUID as CHAR(36)
    correlation_id: String,
    user_id: String,
    platform: String,
    payload: Json<serde_json::Value>,
    idempotency_key: String,
    status: String,
    retry_count: u32,
    next_retry_at: Option<DateTime<Utc>>,
    error_log: Option<String>,
    scheduled_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for PublishJob {
    type Error = RelayError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| RelayError::Internal(format!("Invalid UUID in database: {}", e)))?;
        let user_id = Uuid::parse_str(&row.user_id)
            .map_err(|e| RelayError::Internal(format!("Invalid UUID in database: {}", e)))?;

        Ok(PublishJob {
            id: JobId::from_uuid(id),
            correlation_id: CorrelationId::new(row.correlation_id),
            user_id: UserId::from_uuid(user_id),
            platform: Platform::from_str(&row.platform)?,
            payload: row.payload.0,
            idempotency_key: row.idempotency_key,
            status: JobStatus::from_str(&row.status)?,
            retry_count: row.retry_count,
            next_retry_at: row.next_retry_at,
            error_log: row.error_log,
            scheduled_time: row.scheduled_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r"
    id, correlation_id, user_id, platform, payload, idempotency_key,
    status, retry_count, next_retry_at, error_log, scheduled_time,
    created_at, updated_at
";

#[async_trait]
impl JobStore for MySqlJobStore {
    async fn insert(&self, job: &PublishJob) -> RelayResult<InsertOutcome> {
        debug!(job_id = %job.id, platform = %job.platform, "Inserting publish job");

        let result = sqlx::query(
            r#"
            INSERT INTO publish_jobs
                (id, correlation_id, user_id, platform, payload, idempotency_key,
                 status, retry_count, next_retry_at, error_log, scheduled_time,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.correlation_id.as_str())
        .bind(job.user_id.to_string())
        .bind(job.platform.as_str())
        .bind(Json(&job.payload))
        .bind(&job.idempotency_key)
        .bind(job.status.as_str())
        .bind(job.retry_count)
        .bind(job.next_retry_at)
        .bind(&job.error_log)
        .bind(job.scheduled_time)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(self.pool.inner())
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(e) => match RelayError::from(e) {
                RelayError::Conflict(_) => Ok(InsertOutcome::DuplicateKey),
                other => Err(other),
            },
        }
    }

    async fn find_by_id(&self, id: JobId) -> RelayResult<Option<PublishJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM publish_jobs WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(PublishJob::try_from).transpose()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> RelayResult<Option<PublishJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM publish_jobs WHERE idempotency_key = ?"
        ))
        .bind(key)
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(PublishJob::try_from).transpose()
    }

    async fn mark_dispatched(&self, id: JobId) -> RelayResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE publish_jobs
            SET status = 'dispatched', updated_at = UTC_TIMESTAMP(3)
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(id.to_string())
        .execute(self.pool.inner())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RelayError::Conflict(format!(
                "job {} is not pending; refusing dispatch transition",
                id
            )));
        }
        Ok(())
    }

    async fn mark_succeeded(&self, id: JobId) -> RelayResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE publish_jobs
            SET status = 'succeeded', next_retry_at = NULL, updated_at = UTC_TIMESTAMP(3)
            WHERE id = ? AND status = 'dispatched'
            "#,
        )
        .bind(id.to_string())
        .execute(self.pool.inner())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RelayError::Conflict(format!(
                "job {} is not dispatched; refusing success transition",
                id
            )));
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: JobId,
        retry_count: u32,
        next_retry_at: DateTime<Utc>,
        error_log: &str,
    ) -> RelayResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE publish_jobs
            SET status = 'failed', retry_count = ?, next_retry_at = ?,
                error_log = ?, updated_at = UTC_TIMESTAMP(3)
            WHERE id = ? AND status = 'dispatched'
            "#,
        )
        .bind(retry_count)
        .bind(next_retry_at)
        .bind(error_log)
        .bind(id.to_string())
        .execute(self.pool.inner())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RelayError::Conflict(format!(
                "job {} is not dispatched; refusing failure transition",
                id
            )));
        }
        Ok(())
    }

    async fn mark_exhausted(
        &self,
        id: JobId,
        retry_count: u32,
        error_log: &str,
    ) -> RelayResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE publish_jobs
            SET status = 'exhausted', retry_count = ?, next_retry_at = NULL,
                error_log = ?, updated_at = UTC_TIMESTAMP(3)
            WHERE id = ? AND status IN ('dispatched', 'failed')
            "#,
        )
        .bind(retry_count)
        .bind(error_log)
        .bind(id.to_string())
        .execute(self.pool.inner())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RelayError::Conflict(format!(
                "job {} is terminal or missing; refusing exhausted transition",
                id
            )));
        }
        Ok(())
    }

    async fn find_failed_retryable(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
        limit: u32,
    ) -> RelayResult<Vec<PublishJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM publish_jobs
            WHERE status = 'failed'
              AND retry_count < ?
              AND (next_retry_at IS NULL OR next_retry_at <= ?)
            ORDER BY next_retry_at ASC
            LIMIT ?
            "#
        ))
        .bind(max_attempts)
        .bind(now)
        .bind(limit)
        .fetch_all(self.pool.inner())
        .await?;

        rows.into_iter().map(PublishJob::try_from).collect()
    }

    async fn cas_requeue(
        &self,
        id: JobId,
        expected_retry_count: u32,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> RelayResult<bool> {
        // The retry_count condition is the compare-and-swap guard:
        // overlapping sweeps that read the same row race here, and the
        // row version admits exactly one writer.
        let result = sqlx::query(
            r#"
            UPDATE publish_jobs
            SET status = 'pending', next_retry_at = ?, updated_at = UTC_TIMESTAMP(3)
            WHERE id = ? AND status = 'failed' AND retry_count = ?
            "#,
        )
        .bind(next_retry_at)
        .bind(id.to_string())
        .bind(expected_retry_count)
        .execute(self.pool.inner())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_succeeded_since(
        &self,
        user_id: UserId,
        platform: Platform,
        since: DateTime<Utc>,
    ) -> RelayResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM publish_jobs
            WHERE user_id = ? AND platform = ? AND status = 'succeeded'
              AND created_at >= ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(platform.as_str())
        .bind(since)
        .fetch_one(self.pool.inner())
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
