// Portal Sync Infrastructure - SQLite Adapter
// Implements: PublicationJobStore, DocumentLeases, DocumentRepository

mod connection;
mod document_repository;
mod error;
mod job_store;
mod migration;

pub use connection::create_pool;
pub use document_repository::SqliteDocumentRepository;
pub use job_store::SqlitePublicationJobStore;
pub use migration::run_migrations;

// sqlx::Error -> AppError goes through error::map_sqlx_error (orphan rule)
