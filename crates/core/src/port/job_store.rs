// Publication Job Store Port (Interface)

use crate::domain::{JobId, PublicationJob};
use crate::error::Result;
use async_trait::async_trait;

/// Durable store of publish/delete intents
///
/// Jobs are never deleted; finished jobs are the audit trail.
#[async_trait]
pub trait PublicationJobStore: Send + Sync {
    /// Insert a new job (normally PENDING)
    async fn insert(&self, job: &PublicationJob) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<PublicationJob>>;

    /// All PENDING jobs, ascending creation order (ties by insertion order)
    async fn fetch_pending(&self) -> Result<Vec<PublicationJob>>;

    /// PENDING -> SUCCESS
    ///
    /// # Errors
    /// - `AppError::NotFound` if the job does not exist
    /// - `AppError::InvalidState` if the job is already terminal
    async fn mark_success(&self, job: &PublicationJob, finished_at: i64) -> Result<()>;

    /// PENDING -> ERROR
    ///
    /// Same errors as `mark_success`.
    async fn mark_error(
        &self,
        job: &PublicationJob,
        finished_at: i64,
        retryable: bool,
        reason: &str,
    ) -> Result<()>;

    /// Retryable failures that are still the newest job of their document
    ///
    /// Only failures with `attempt < max_attempts` are returned.
    async fn find_retry_candidates(&self, max_attempts: i32) -> Result<Vec<PublicationJob>>;

    /// All jobs of one document, ascending creation order
    async fn find_by_document_number(&self, document_number: &str) -> Result<Vec<PublicationJob>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::JobStatus;
    use crate::error::AppError;
    use std::sync::{Mutex, MutexGuard};

    /// In-memory job store (insertion order is the tie breaker)
    #[derive(Default)]
    pub struct InMemoryJobStore {
        jobs: Mutex<Vec<PublicationJob>>,
    }

    impl InMemoryJobStore {
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> MutexGuard<'_, Vec<PublicationJob>> {
            self.jobs.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn all(&self) -> Vec<PublicationJob> {
            self.lock().clone()
        }

        fn finish(&self, job: &PublicationJob, status: JobStatus, finished_at: i64) -> Result<()> {
            let mut jobs = self.lock();
            let stored = jobs
                .iter_mut()
                .find(|j| j.id == job.id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job.id)))?;

            if stored.status.is_terminal() {
                return Err(AppError::InvalidState(format!(
                    "Cannot update job {} from {} to {}",
                    job.id, stored.status, status
                )));
            }
            stored.status = status;
            stored.finished_at = Some(finished_at);
            Ok(())
        }
    }

    #[async_trait]
    impl PublicationJobStore for InMemoryJobStore {
        async fn insert(&self, job: &PublicationJob) -> Result<()> {
            let mut jobs = self.lock();
            if jobs.iter().any(|j| j.id == job.id) {
                return Err(AppError::Database(format!(
                    "Unique constraint violation: job {}",
                    job.id
                )));
            }
            jobs.push(job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &JobId) -> Result<Option<PublicationJob>> {
            Ok(self.lock().iter().find(|j| &j.id == id).cloned())
        }

        async fn fetch_pending(&self) -> Result<Vec<PublicationJob>> {
            let mut pending: Vec<PublicationJob> =
                self.lock().iter().filter(|j| j.is_pending()).cloned().collect();
            // stable sort keeps insertion order for equal timestamps
            pending.sort_by_key(|j| j.created_at);
            Ok(pending)
        }

        async fn mark_success(&self, job: &PublicationJob, finished_at: i64) -> Result<()> {
            self.finish(job, JobStatus::Succeeded, finished_at)
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
            self.finish(job, status, finished_at)
        }

        async fn find_retry_candidates(&self, max_attempts: i32) -> Result<Vec<PublicationJob>> {
            let jobs = self.lock();
            let candidates = jobs
                .iter()
                .enumerate()
                .filter(|(_, j)| {
                    matches!(j.status, JobStatus::Failed { retryable: true, .. })
                        && j.attempt < max_attempts
                })
                .filter(|(idx, j)| {
                    !jobs.iter().enumerate().any(|(other_idx, other)| {
                        other.document_number == j.document_number
                            && (other.created_at, other_idx) > (j.created_at, *idx)
                    })
                })
                .map(|(_, j)| j.clone())
                .collect();
            Ok(candidates)
        }

        async fn find_by_document_number(
            &self,
            document_number: &str,
        ) -> Result<Vec<PublicationJob>> {
            let mut jobs: Vec<PublicationJob> = self
                .lock()
                .iter()
                .filter(|j| j.document_number == document_number)
                .cloned()
                .collect();
            jobs.sort_by_key(|j| j.created_at);
            Ok(jobs)
        }
    }
}
