// Object Store Port
// Prefix-addressable blob store holding the portal's public view of documents

use async_trait::async_trait;
use thiserror::Error;

/// Object store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Prefix or key does not exist
    #[error("No such key: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// Transient network or storage failure
    #[error("Storage IO error: {0}")]
    Io(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Object store client
///
/// Keys have the form `{documentNumber}/{filename}` or `changelogs/{name}`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all keys starting with `prefix`, sorted ascending
    ///
    /// # Errors
    /// - `StorageError::NotFound` if nothing was ever stored under the prefix
    /// - `StorageError::Io` on transport failure
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Create or overwrite an object
    async fn put(&self, key: &str, content: &[u8]) -> Result<(), StorageError>;

    /// Remove an object
    ///
    /// # Errors
    /// - `StorageError::NotFound` if the key does not exist
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Mutex, MutexGuard};

    /// Recorded store operation
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StoreCall {
        List(String),
        Put(String),
        Delete(String),
    }

    /// Which operation a scripted failure applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum FailOn {
        List,
        Put,
        Delete,
    }

    #[derive(Default)]
    struct State {
        objects: BTreeMap<String, Vec<u8>>,
        calls: Vec<StoreCall>,
        // (operation, key prefix) -> error to return
        failures: HashMap<(FailOn, String), StorageError>,
        missing_prefix_as_not_found: bool,
    }

    /// In-memory object store with a call log and scripted failures
    pub struct InMemoryObjectStore {
        state: Mutex<State>,
    }

    impl Default for InMemoryObjectStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryObjectStore {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(State {
                    missing_prefix_as_not_found: true,
                    ..State::default()
                }),
            }
        }

        /// Store that lists an unknown prefix as empty instead of NotFound
        pub fn lenient() -> Self {
            let store = Self::new();
            store.lock().missing_prefix_as_not_found = false;
            store
        }

        fn lock(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        /// Seed an object without recording a call
        pub fn insert(&self, key: impl Into<String>, content: impl Into<Vec<u8>>) {
            self.lock().objects.insert(key.into(), content.into());
        }

        pub fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.lock().objects.get(key).cloned()
        }

        pub fn keys(&self) -> Vec<String> {
            self.lock().objects.keys().cloned().collect()
        }

        pub fn calls(&self) -> Vec<StoreCall> {
            self.lock().calls.clone()
        }

        /// Calls that mutate the store
        pub fn mutations(&self) -> Vec<StoreCall> {
            self.calls()
                .into_iter()
                .filter(|c| !matches!(c, StoreCall::List(_)))
                .collect()
        }

        pub fn clear_calls(&self) {
            self.lock().calls.clear();
        }

        /// Fail every `op` on keys starting with `key_prefix`
        pub fn fail_on(&self, op: FailOn, key_prefix: impl Into<String>, error: StorageError) {
            self.lock().failures.insert((op, key_prefix.into()), error);
        }

        pub fn clear_failures(&self) {
            self.lock().failures.clear();
        }

        fn scripted_failure(state: &State, op: FailOn, key: &str) -> Option<StorageError> {
            state
                .failures
                .iter()
                .find(|((o, prefix), _)| *o == op && key.starts_with(prefix.as_str()))
                .map(|(_, err)| err.clone())
        }
    }

    #[async_trait]
    impl ObjectStore for InMemoryObjectStore {
        async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            let mut state = self.lock();
            state.calls.push(StoreCall::List(prefix.to_string()));
            if let Some(err) = Self::scripted_failure(&state, FailOn::List, prefix) {
                return Err(err);
            }

            let keys: Vec<String> = state
                .objects
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();

            if keys.is_empty() && state.missing_prefix_as_not_found {
                return Err(StorageError::NotFound(prefix.to_string()));
            }
            Ok(keys)
        }

        async fn put(&self, key: &str, content: &[u8]) -> Result<(), StorageError> {
            let mut state = self.lock();
            state.calls.push(StoreCall::Put(key.to_string()));
            if let Some(err) = Self::scripted_failure(&state, FailOn::Put, key) {
                return Err(err);
            }
            state.objects.insert(key.to_string(), content.to_vec());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            let mut state = self.lock();
            state.calls.push(StoreCall::Delete(key.to_string()));
            if let Some(err) = Self::scripted_failure(&state, FailOn::Delete, key) {
                return Err(err);
            }
            match state.objects.remove(key) {
                Some(_) => Ok(()),
                None => Err(StorageError::NotFound(key.to_string())),
            }
        }
    }
}
