// Per-job pipeline: read aggregate -> transform -> reconcile -> record status

use crate::application::reconciler::{ObjectReconciler, ReconcileOutcome};
use crate::domain::{
    DesiredObjectSet, PortalPublicationStatus, PublicationJob, PublicationJobType,
};
use crate::port::{DocumentRepository, StorageError, ValidationError, XmlTransformer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a single job failed
#[derive(Error, Debug)]
pub enum PublicationError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Document repository error: {0}")]
    Repository(String),

    #[error("Job panicked: {0}")]
    Panicked(String),
}

impl PublicationError {
    /// Transient failures worth a follow-up attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            PublicationError::Storage(StorageError::Io(_)) => true,
            PublicationError::Repository(_) => true,
            PublicationError::Storage(_)
            | PublicationError::DocumentNotFound(_)
            | PublicationError::Validation(_)
            | PublicationError::Panicked(_) => false,
        }
    }
}

impl From<crate::error::AppError> for PublicationError {
    fn from(err: crate::error::AppError) -> Self {
        PublicationError::Repository(err.to_string())
    }
}

/// Everything one job needs; cheap to clone into a spawned task
#[derive(Clone)]
pub struct PublicationPipeline {
    documents: Arc<dyn DocumentRepository>,
    transformer: Arc<dyn XmlTransformer>,
    reconciler: Arc<ObjectReconciler>,
}

impl PublicationPipeline {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        transformer: Arc<dyn XmlTransformer>,
        reconciler: Arc<ObjectReconciler>,
    ) -> Self {
        Self {
            documents,
            transformer,
            reconciler,
        }
    }

    pub async fn run(&self, job: &PublicationJob) -> Result<ReconcileOutcome, PublicationError> {
        match job.job_type {
            PublicationJobType::Publish => self.publish(&job.document_number).await,
            PublicationJobType::Delete => self.delete(&job.document_number).await,
        }
    }

    async fn publish(&self, document_number: &str) -> Result<ReconcileOutcome, PublicationError> {
        let aggregate = self
            .documents
            .find_by_document_number(document_number)
            .await?
            .ok_or_else(|| PublicationError::DocumentNotFound(document_number.to_string()))?;

        // validation failures must not touch the store or the status
        let xml = self.transformer.transform(&aggregate).map_err(|e| {
            warn!(document_number = %document_number, reason = %e.reason, "XML validation failed");
            e
        })?;

        let desired = DesiredObjectSet::for_publication(
            document_number,
            xml.into_bytes(),
            &aggregate.attachments,
        );
        debug!(
            document_number = %document_number,
            objects = desired.objects().len(),
            "Publishing document"
        );

        let outcome = self.reconciler.reconcile(document_number, &desired).await?;
        self.documents
            .set_publication_status(document_number, PortalPublicationStatus::Published)
            .await?;
        Ok(outcome)
    }

    async fn delete(&self, document_number: &str) -> Result<ReconcileOutcome, PublicationError> {
        let outcome = self
            .reconciler
            .reconcile(document_number, &DesiredObjectSet::empty())
            .await?;
        if outcome.deleted.is_empty() {
            debug!(document_number = %document_number, "Nothing to withdraw, already absent");
        }
        self.documents
            .set_publication_status(document_number, PortalPublicationStatus::Withdrawn)
            .await?;
        Ok(outcome)
    }
}
