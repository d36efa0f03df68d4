// Domain Layer - Pure business logic and entities

pub mod document;
pub mod error;
pub mod job;
pub mod object;

// Re-exports
pub use document::{Attachment, CoreData, DocumentAggregate, PortalPublicationStatus, Texts};
pub use error::DomainError;
pub use job::{
    validate_document_number, DocumentNumber, JobId, JobStatus, PublicationJob,
    PublicationJobType,
};
pub use object::{
    attachment_key, document_prefix, xml_key, DesiredObject, DesiredObjectSet, CHANGELOG_DIR,
    CHANGELOG_PREFIX,
};
