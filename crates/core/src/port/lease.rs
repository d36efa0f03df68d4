// Document Lease Port
// Advisory per-document lock shared by executor runs

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait DocumentLeases: Send + Sync {
    /// Take or renew the lease on a document
    ///
    /// Succeeds when the document is unleased, the existing lease expired
    /// (`expires_at <= now`), or `holder` already owns it.
    ///
    /// # Returns
    /// true if `holder` owns the lease until `now + ttl_ms`
    async fn try_acquire(
        &self,
        document_number: &str,
        holder: &str,
        now: i64,
        ttl_ms: i64,
    ) -> Result<bool>;

    /// Release the lease if `holder` owns it (no-op otherwise)
    async fn release(&self, document_number: &str, holder: &str) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    /// In-memory lease table: document -> (holder, expires_at)
    #[derive(Default)]
    pub struct InMemoryLeases {
        leases: Mutex<HashMap<String, (String, i64)>>,
    }

    impl InMemoryLeases {
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> MutexGuard<'_, HashMap<String, (String, i64)>> {
            self.leases.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn holder(&self, document_number: &str) -> Option<String> {
            self.lock().get(document_number).map(|(h, _)| h.clone())
        }
    }

    #[async_trait]
    impl DocumentLeases for InMemoryLeases {
        async fn try_acquire(
            &self,
            document_number: &str,
            holder: &str,
            now: i64,
            ttl_ms: i64,
        ) -> Result<bool> {
            let mut leases = self.lock();
            let free = match leases.get(document_number) {
                None => true,
                Some((current, expires_at)) => current == holder || *expires_at <= now,
            };
            if free {
                leases.insert(
                    document_number.to_string(),
                    (holder.to_string(), now + ttl_ms),
                );
            }
            Ok(free)
        }

        async fn release(&self, document_number: &str, holder: &str) -> Result<()> {
            let mut leases = self.lock();
            if leases
                .get(document_number)
                .is_some_and(|(current, _)| current == holder)
            {
                leases.remove(document_number);
            }
            Ok(())
        }
    }
}
