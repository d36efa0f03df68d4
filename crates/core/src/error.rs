// Crate-wide error type
// Job-local failures are PublicationError (executor::pipeline); AppError is
// what ports and services return to their callers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid document number or status transition
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Job store, lease table or document accessor failure
    #[error("Database error: {0}")]
    Database(String),

    #[error("Object store error: {0}")]
    Storage(#[from] crate::port::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Job already terminal
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
