// Publication Trigger - enqueue use case
// In-process counterpart of the editor's publish / withdraw actions

use crate::domain::{validate_document_number, PublicationJob, PublicationJobType};
use crate::error::Result;
use crate::port::{IdProvider, PublicationJobStore, TimeProvider};
use std::sync::Arc;
use tracing::info;

pub struct PublicationTrigger {
    job_store: Arc<dyn PublicationJobStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl PublicationTrigger {
    pub fn new(
        job_store: Arc<dyn PublicationJobStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job_store,
            id_provider,
            time_provider,
        }
    }

    /// Enqueue a PUBLISH job
    pub async fn publish(&self, document_number: &str) -> Result<PublicationJob> {
        self.enqueue(document_number, PublicationJobType::Publish)
            .await
    }

    /// Enqueue a DELETE job
    pub async fn withdraw(&self, document_number: &str) -> Result<PublicationJob> {
        self.enqueue(document_number, PublicationJobType::Delete)
            .await
    }

    /// Create a PENDING job (with injected ID and timestamp for determinism)
    pub async fn enqueue(
        &self,
        document_number: &str,
        job_type: PublicationJobType,
    ) -> Result<PublicationJob> {
        validate_document_number(document_number)?;

        let job = PublicationJob::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            document_number,
            job_type,
        );
        self.job_store.insert(&job).await?;

        info!(
            job_id = %job.id,
            document_number = %job.document_number,
            job_type = %job.job_type,
            "Publication job enqueued"
        );
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_store::mocks::InMemoryJobStore;
    use crate::port::time_provider::mocks::FixedTimeProvider;

    fn trigger(store: Arc<InMemoryJobStore>) -> PublicationTrigger {
        PublicationTrigger::new(
            store,
            Arc::new(SequentialIdProvider::new("job")),
            Arc::new(FixedTimeProvider::with_step(1000, 1)),
        )
    }

    #[tokio::test]
    async fn test_publish_and_withdraw_enqueue_pending_jobs() {
        let store = Arc::new(InMemoryJobStore::new());
        let trigger = trigger(store.clone());

        let first = trigger.publish("doc1").await.unwrap();
        let second = trigger.withdraw("doc1").await.unwrap();

        assert_eq!(first.id, "job-1");
        assert_eq!(first.job_type, PublicationJobType::Publish);
        assert_eq!(second.job_type, PublicationJobType::Delete);
        assert!(second.created_at > first.created_at);

        let pending = store.fetch_pending().await.unwrap();
        assert_eq!(pending, vec![first, second]);
    }

    #[tokio::test]
    async fn test_invalid_document_number_is_rejected() {
        let store = Arc::new(InMemoryJobStore::new());
        let trigger = trigger(store.clone());

        let err = trigger.publish("../etc").await.unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
        assert!(store.all().is_empty());
    }
}
