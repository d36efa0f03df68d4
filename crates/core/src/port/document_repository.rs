// Document Read Accessor Port
// The editing side owns documents; this engine only reads them and records
// their portal visibility.

use crate::domain::{DocumentAggregate, PortalPublicationStatus};
use crate::error::Result;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Current publishable aggregate, or None if the document does not exist
    async fn find_by_document_number(
        &self,
        document_number: &str,
    ) -> Result<Option<DocumentAggregate>>;

    /// Record the portal visibility after a successful job
    async fn set_publication_status(
        &self,
        document_number: &str,
        status: PortalPublicationStatus,
    ) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    /// In-memory document accessor
    #[derive(Default)]
    pub struct InMemoryDocumentRepository {
        documents: Mutex<HashMap<String, DocumentAggregate>>,
        // status writes for documents we do not hold
        orphan_statuses: Mutex<HashMap<String, PortalPublicationStatus>>,
    }

    impl InMemoryDocumentRepository {
        pub fn new() -> Self {
            Self::default()
        }

        fn documents(&self) -> MutexGuard<'_, HashMap<String, DocumentAggregate>> {
            self.documents.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn upsert(&self, document: DocumentAggregate) {
            self.documents()
                .insert(document.document_number.clone(), document);
        }

        pub fn remove(&self, document_number: &str) {
            self.documents().remove(document_number);
        }

        /// Latest recorded status, including documents removed since
        pub fn status_of(&self, document_number: &str) -> Option<PortalPublicationStatus> {
            if let Some(doc) = self.documents().get(document_number) {
                return Some(doc.portal_publication_status);
            }
            self.orphan_statuses
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(document_number)
                .copied()
        }
    }

    #[async_trait]
    impl DocumentRepository for InMemoryDocumentRepository {
        async fn find_by_document_number(
            &self,
            document_number: &str,
        ) -> Result<Option<DocumentAggregate>> {
            Ok(self.documents().get(document_number).cloned())
        }

        async fn set_publication_status(
            &self,
            document_number: &str,
            status: PortalPublicationStatus,
        ) -> Result<()> {
            match self.documents().get_mut(document_number) {
                Some(doc) => doc.portal_publication_status = status,
                None => {
                    self.orphan_statuses
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(document_number.to_string(), status);
                }
            }
            Ok(())
        }
    }
}
