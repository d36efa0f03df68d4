// SQLite PublicationJobStore + DocumentLeases Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use portal_sync_core::domain::{JobId, JobStatus, PublicationJob, PublicationJobType};
use portal_sync_core::error::{AppError, Result};
use portal_sync_core::port::{DocumentLeases, PublicationJobStore};
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqlitePublicationJobStore {
    pool: SqlitePool,
}

impl SqlitePublicationJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Finish a PENDING job; the status guard makes a second transition fail
    async fn finish(
        &self,
        job: &PublicationJob,
        status: JobStatus,
        finished_at: i64,
    ) -> Result<()> {
        let (retryable, reason) = match &status {
            JobStatus::Failed { retryable, reason } => (*retryable, Some(reason.as_str())),
            _ => (false, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE publication_jobs
            SET status = ?, retryable = ?, error_reason = ?, finished_at = ?
            WHERE id = ? AND status = 'PENDING'
            "#,
        )
        .bind(status.code())
        .bind(retryable)
        .bind(reason)
        .bind(finished_at)
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find_by_id(&job.id).await? {
            None => Err(AppError::NotFound(format!("Job {} not found", job.id))),
            Some(current) => Err(AppError::InvalidState(format!(
                "Job {} is already {}, cannot mark {}",
                job.id,
                current.status,
                status.code()
            ))),
        }
    }
}

#[async_trait]
impl PublicationJobStore for SqlitePublicationJobStore {
    async fn insert(&self, job: &PublicationJob) -> Result<()> {
        let (retryable, reason) = match &job.status {
            JobStatus::Failed { retryable, reason } => (*retryable, Some(reason.as_str())),
            _ => (false, None),
        };

        sqlx::query(
            r#"
            INSERT INTO publication_jobs (
                id, document_number, job_type, status, retryable, error_reason,
                attempt, created_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.document_number)
        .bind(job.job_type.as_str())
        .bind(job.status.code())
        .bind(retryable)
        .bind(reason)
        .bind(job.attempt)
        .bind(job.created_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<PublicationJob>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM publication_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn fetch_pending(&self) -> Result<Vec<PublicationJob>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM publication_jobs
            WHERE status = 'PENDING'
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn mark_success(&self, job: &PublicationJob, finished_at: i64) -> Result<()> {
        self.finish(job, JobStatus::Succeeded, finished_at).await
    }

    async fn mark_error(
        &self,
        job: &PublicationJob,
        finished_at: i64,
        retryable: bool,
        reason: &str,
    ) -> Result<()> {
        let status = JobStatus::Failed {
            retryable,
            reason: reason.to_string(),
        };
        self.finish(job, status, finished_at).await
    }

    async fn find_retry_candidates(&self, max_attempts: i32) -> Result<Vec<PublicationJob>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT f.* FROM publication_jobs f
            WHERE f.status = 'ERROR' AND f.retryable = 1 AND f.attempt < ?
              -- a newer job of the same document supersedes the failure
              AND NOT EXISTS (
                  SELECT 1 FROM publication_jobs n
                  WHERE n.document_number = f.document_number
                    AND (n.created_at > f.created_at
                         OR (n.created_at = f.created_at AND n.seq > f.seq))
              )
            ORDER BY f.created_at ASC, f.seq ASC
            "#,
        )
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn find_by_document_number(&self, document_number: &str) -> Result<Vec<PublicationJob>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM publication_jobs
            WHERE document_number = ?
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(document_number)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }
}

#[async_trait]
impl DocumentLeases for SqlitePublicationJobStore {
    async fn try_acquire(
        &self,
        document_number: &str,
        holder: &str,
        now: i64,
        ttl_ms: i64,
    ) -> Result<bool> {
        // The conflict branch only fires for an expired or self-owned lease,
        // so zero affected rows means someone else holds it.
        let result = sqlx::query(
            r#"
            INSERT INTO document_leases (document_number, holder, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(document_number) DO UPDATE
            SET holder = excluded.holder, expires_at = excluded.expires_at
            WHERE document_leases.holder = excluded.holder
               OR document_leases.expires_at <= ?
            "#,
        )
        .bind(document_number)
        .bind(holder)
        .bind(now.saturating_add(ttl_ms))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let acquired = result.rows_affected() > 0;
        debug!(document_number = %document_number, holder = %holder, acquired, "Lease attempt");
        Ok(acquired)
    }

    async fn release(&self, document_number: &str, holder: &str) -> Result<()> {
        sqlx::query("DELETE FROM document_leases WHERE document_number = ? AND holder = ?")
            .bind(document_number)
            .bind(holder)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    #[allow(dead_code)]
    seq: i64,
    id: String,
    document_number: String,
    job_type: String,
    status: String,
    retryable: bool,
    error_reason: Option<String>,
    attempt: i32,
    created_at: i64,
    finished_at: Option<i64>,
}

impl JobRow {
    fn into_job(self) -> Result<PublicationJob> {
        let job_type: PublicationJobType = self.job_type.parse()?;
        let status = JobStatus::from_columns(&self.status, self.retryable, self.error_reason)?;

        Ok(PublicationJob {
            id: self.id,
            document_number: self.document_number,
            job_type,
            status,
            created_at: self.created_at,
            finished_at: self.finished_at,
            attempt: self.attempt,
        })
    }
}
