// Port Layer - Interfaces for external dependencies

pub mod document_repository;
pub mod id_provider; // For deterministic testing
pub mod job_store;
pub mod lease;
pub mod object_store;
pub mod time_provider;
pub mod xml_transformer;

// Re-exports
pub use document_repository::DocumentRepository;
pub use id_provider::IdProvider;
pub use job_store::PublicationJobStore;
pub use lease::DocumentLeases;
pub use object_store::{ObjectStore, StorageError};
pub use time_provider::TimeProvider;
pub use xml_transformer::{ValidationError, XmlContent, XmlTransformer};
