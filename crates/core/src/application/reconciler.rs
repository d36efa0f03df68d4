// Object Diff Reconciler
// Converges the objects under one document prefix to a desired set

use crate::domain::{document_prefix, validate_document_number, DesiredObjectSet};
use crate::port::{ObjectStore, StorageError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a reconciliation changed in the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Keys written, in put order (XML rendition first)
    pub put: Vec<String>,
    /// Keys removed, in listing order
    pub deleted: Vec<String>,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.put.is_empty() && self.deleted.is_empty()
    }
}

/// Reconciler for one prefix at a time
///
/// No content hashing: every desired object is rewritten on each run, so
/// metadata changes always reach the store. Re-running is always safe.
pub struct ObjectReconciler {
    store: Arc<dyn ObjectStore>,
}

impl ObjectReconciler {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Make the store's keys under `{document_number}/` equal `desired`
    ///
    /// All puts happen before any delete, so readers never see an empty
    /// directory during a republish.
    ///
    /// # Errors
    /// `InvalidKey` before any store call if `document_number` is not a
    /// usable prefix (this includes the changelog directory). The first
    /// failing put or delete aborts the reconciliation. A delete reporting
    /// NotFound is not a failure: the key is already gone.
    pub async fn reconcile(
        &self,
        document_number: &str,
        desired: &DesiredObjectSet,
    ) -> Result<ReconcileOutcome, StorageError> {
        if let Err(e) = validate_document_number(document_number) {
            warn!(
                document_number = %document_number,
                error = %e,
                "Refusing to reconcile prefix"
            );
            return Err(StorageError::InvalidKey(e.to_string()));
        }

        let prefix = document_prefix(document_number);
        let existing = self.list_existing(&prefix).await?;

        let mut outcome = ReconcileOutcome::default();

        for object in desired.objects() {
            self.store.put(&object.key, &object.content).await?;
            outcome.put.push(object.key.clone());
        }

        for key in existing.iter().filter(|k| !desired.contains_key(k)) {
            match self.store.delete(key).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(key = %key, "Object vanished before delete");
                }
                Err(e) => return Err(e),
            }
            outcome.deleted.push(key.clone());
        }

        info!(
            document_number = %document_number,
            existing = existing.len(),
            put = outcome.put.len(),
            deleted = outcome.deleted.len(),
            "Reconciled document prefix"
        );
        Ok(outcome)
    }

    async fn list_existing(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        match self.store.list(prefix).await {
            Ok(keys) => Ok(keys
                .into_iter()
                // the listing is prefix-based: "1/" must not pick up "10/..."
                .filter(|k| k.starts_with(prefix) && k.len() > prefix.len())
                .collect()),
            Err(StorageError::NotFound(_)) => {
                debug!(prefix = %prefix, "Prefix not found, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(prefix = %prefix, error = %e, "Listing prefix failed");
                Err(e)
            }
        }
    }
}
