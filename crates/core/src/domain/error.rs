// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid job status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Invalid document number {number:?}: {reason}")]
    InvalidDocumentNumber { number: String, reason: String },

    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Unknown job status: {0}")]
    UnknownJobStatus(String),

    #[error("Unknown portal publication status: {0}")]
    UnknownPublicationStatus(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
