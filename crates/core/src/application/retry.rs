// Retry logic
// A retryable failure stays terminal; a retry is a fresh PENDING job.
use crate::domain::{JobStatus, PublicationJob};
use crate::error::Result;
use crate::port::{IdProvider, PublicationJobStore, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Enqueue a follow-up job now
    Retry,
    /// Backoff not elapsed yet (ms remaining)
    Wait(i64),
    /// Do not retry, job has failed permanently
    GiveUp,
}

/// Bounded retry with exponential backoff
///
/// delay = base_delay * 2^(attempt - 1), measured from the failure time.
pub struct RetryPolicy {
    job_store: Arc<dyn PublicationJobStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    base_delay_ms: i64,
    max_attempts: i32,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `base_delay_ms` - Backoff before the second attempt
    /// * `max_attempts` - Total attempts including the first (1 disables retries)
    pub fn new(
        job_store: Arc<dyn PublicationJobStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        base_delay_ms: i64,
        max_attempts: i32,
    ) -> Self {
        Self {
            job_store,
            id_provider,
            time_provider,
            base_delay_ms,
            max_attempts,
        }
    }

    /// Backoff before the attempt following `attempt`
    pub fn backoff_ms(&self, attempt: i32) -> i64 {
        let exponent = (attempt - 1).clamp(0, 30) as u32;
        self.base_delay_ms.saturating_mul(1_i64 << exponent)
    }

    pub fn should_retry(&self, job: &PublicationJob, now: i64) -> RetryDecision {
        let retryable = matches!(job.status, JobStatus::Failed { retryable: true, .. });
        if !retryable {
            return RetryDecision::GiveUp;
        }
        if job.attempt >= self.max_attempts {
            warn!(
                job_id = %job.id,
                attempt = job.attempt,
                max_attempts = self.max_attempts,
                "Max retry attempts reached"
            );
            return RetryDecision::GiveUp;
        }

        let failed_at = job.finished_at.unwrap_or(job.created_at);
        let due_at = failed_at.saturating_add(self.backoff_ms(job.attempt));
        if now < due_at {
            RetryDecision::Wait(due_at - now)
        } else {
            RetryDecision::Retry
        }
    }

    /// Enqueue follow-up jobs for every due retryable failure
    ///
    /// # Returns
    /// The newly created jobs
    pub async fn requeue_due(&self) -> Result<Vec<PublicationJob>> {
        let candidates = self
            .job_store
            .find_retry_candidates(self.max_attempts)
            .await?;
        let now = self.time_provider.now_millis();
        let mut requeued = Vec::new();

        for failed in candidates {
            match self.should_retry(&failed, now) {
                RetryDecision::Retry => {
                    let retry =
                        PublicationJob::retry_of(&failed, self.id_provider.generate_id(), now);
                    self.job_store.insert(&retry).await?;
                    info!(
                        job_id = %retry.id,
                        retry_of = %failed.id,
                        document_number = %retry.document_number,
                        attempt = retry.attempt,
                        "Retrying failed publication job"
                    );
                    requeued.push(retry);
                }
                RetryDecision::Wait(remaining_ms) => {
                    info!(
                        job_id = %failed.id,
                        remaining_ms = remaining_ms,
                        "Retry backoff not elapsed"
                    );
                }
                RetryDecision::GiveUp => {}
            }
        }
        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PublicationJobType;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_store::mocks::InMemoryJobStore;
    use crate::port::time_provider::mocks::FixedTimeProvider;

    fn failed_job(id: &str, attempt: i32, retryable: bool, finished_at: i64) -> PublicationJob {
        let mut job = PublicationJob::new(id, finished_at - 10, "doc", PublicationJobType::Publish);
        job.attempt = attempt;
        job.fail(finished_at, retryable, "boom").unwrap();
        job
    }

    fn policy(store: Arc<InMemoryJobStore>, clock: Arc<FixedTimeProvider>) -> RetryPolicy {
        RetryPolicy::new(
            store,
            Arc::new(SequentialIdProvider::new("retry")),
            clock,
            1000,
            3,
        )
    }

    #[test]
    fn test_backoff_doubles() {
        let p = policy(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(FixedTimeProvider::new(0)),
        );
        assert_eq!(p.backoff_ms(1), 1000);
        assert_eq!(p.backoff_ms(2), 2000);
        assert_eq!(p.backoff_ms(3), 4000);
    }

    #[test]
    fn test_decisions() {
        let p = policy(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(FixedTimeProvider::new(0)),
        );
        assert_eq!(
            p.should_retry(&failed_job("a", 1, true, 10_000), 10_500),
            RetryDecision::Wait(500)
        );
        assert_eq!(
            p.should_retry(&failed_job("a", 1, true, 10_000), 11_000),
            RetryDecision::Retry
        );
        assert_eq!(
            p.should_retry(&failed_job("a", 1, false, 10_000), 99_000),
            RetryDecision::GiveUp
        );
        assert_eq!(
            p.should_retry(&failed_job("a", 3, true, 10_000), 99_000),
            RetryDecision::GiveUp
        );
    }

    #[tokio::test]
    async fn test_requeue_creates_new_pending_job() {
        let store = Arc::new(InMemoryJobStore::new());
        store.insert(&failed_job("j1", 1, true, 10_000)).await.unwrap();
        let clock = Arc::new(FixedTimeProvider::new(20_000));
        let p = policy(store.clone(), clock);

        let requeued = p.requeue_due().await.unwrap();
        assert_eq!(requeued.len(), 1);
        assert_eq!(requeued[0].attempt, 2);

        // the original stays terminal
        let original = store.find_by_id(&"j1".to_string()).await.unwrap().unwrap();
        assert!(original.status.is_terminal());

        // the retry is now the newest job of the document: no second retry
        assert!(p.requeue_due().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newer_job_suppresses_retry() {
        let store = Arc::new(InMemoryJobStore::new());
        store.insert(&failed_job("j1", 1, true, 10_000)).await.unwrap();
        store
            .insert(&PublicationJob::new("j2", 15_000, "doc", PublicationJobType::Delete))
            .await
            .unwrap();
        let p = policy(store, Arc::new(FixedTimeProvider::new(50_000)));

        assert!(p.requeue_due().await.unwrap().is_empty());
    }
}
