//! Shared wiring for the integration tests: SQLite job store and documents,
//! pluggable object store, deterministic clock.
#![allow(dead_code)]

use std::sync::Arc;

use portal_sync_core::application::{
    ExecutorConfig, PortalXmlTransformer, PublicationExecutor, PublicationTrigger, RetryPolicy,
};
use portal_sync_core::domain::{Attachment, CoreData, DocumentAggregate, JobStatus, Texts};
use portal_sync_core::port::id_provider::mocks::SequentialIdProvider;
use portal_sync_core::port::object_store::mocks::InMemoryObjectStore;
use portal_sync_core::port::time_provider::mocks::FixedTimeProvider;
use portal_sync_core::port::{ObjectStore, PublicationJobStore, XmlTransformer};
use portal_sync_infra_sqlite::{
    create_pool, run_migrations, SqliteDocumentRepository, SqlitePublicationJobStore,
};

pub const START_MILLIS: i64 = 1_791_943_200_000; // 2026-10-14T02:00:00Z
pub const RETRY_BASE_DELAY_MS: i64 = 1_000;
pub const MAX_ATTEMPTS: i32 = 3;

pub struct Engine {
    pub jobs: Arc<SqlitePublicationJobStore>,
    pub documents: Arc<SqliteDocumentRepository>,
    pub store: Arc<InMemoryObjectStore>,
    pub clock: Arc<FixedTimeProvider>,
    pub trigger: PublicationTrigger,
    pub executor: PublicationExecutor,
}

pub struct Sqlite {
    pub jobs: Arc<SqlitePublicationJobStore>,
    pub documents: Arc<SqliteDocumentRepository>,
}

pub async fn sqlite() -> Sqlite {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    Sqlite {
        jobs: Arc::new(SqlitePublicationJobStore::new(pool.clone())),
        documents: Arc::new(SqliteDocumentRepository::new(pool)),
    }
}

pub fn clock() -> Arc<FixedTimeProvider> {
    Arc::new(FixedTimeProvider::with_step(START_MILLIS, 1))
}

/// Executor over the given adapters, with retries enabled
pub fn executor(
    db: &Sqlite,
    store: Arc<dyn ObjectStore>,
    transformer: Arc<dyn XmlTransformer>,
    clock: Arc<FixedTimeProvider>,
    holder: &str,
) -> PublicationExecutor {
    let retry = Arc::new(RetryPolicy::new(
        db.jobs.clone(),
        Arc::new(SequentialIdProvider::new(format!("{}-retry", holder))),
        clock.clone(),
        RETRY_BASE_DELAY_MS,
        MAX_ATTEMPTS,
    ));
    PublicationExecutor::new(
        db.jobs.clone(),
        db.jobs.clone(),
        db.documents.clone(),
        transformer,
        store,
        clock,
        holder,
        ExecutorConfig::default(),
    )
    .with_retry_policy(retry)
}

pub async fn engine() -> Engine {
    engine_with_transformer(Arc::new(PortalXmlTransformer::new())).await
}

pub async fn engine_with_transformer(transformer: Arc<dyn XmlTransformer>) -> Engine {
    let db = sqlite().await;
    let store = Arc::new(InMemoryObjectStore::new());
    let clock = clock();
    let executor = executor(&db, store.clone(), transformer, clock.clone(), "executor-a");
    let trigger = PublicationTrigger::new(
        db.jobs.clone(),
        Arc::new(SequentialIdProvider::new("job")),
        clock.clone(),
    );
    Engine {
        jobs: db.jobs,
        documents: db.documents,
        store,
        clock,
        trigger,
        executor,
    }
}

/// A document passing every mandatory-field check
pub fn publishable(document_number: &str, attachments: &[&str]) -> DocumentAggregate {
    let mut doc = DocumentAggregate::new(document_number);
    doc.core_data = CoreData {
        court: Some("BVerwG".into()),
        file_numbers: vec!["2 C 12.22".into()],
        decision_date: "2023-06-29".parse().ok(),
        document_type: Some("Urteil".into()),
        ecli: None,
    };
    doc.texts = Texts {
        tenor: Some("Die Revision wird zurückgewiesen.".into()),
        grounds: Some("Die zulässige Revision ist unbegründet.".into()),
        ..Texts::default()
    };
    doc.attachments = attachments
        .iter()
        .map(|name| Attachment::new(*name, name.as_bytes().to_vec()))
        .collect();
    doc
}

/// Parsed changelogs in key (= upload time) order
pub fn changelogs(store: &InMemoryObjectStore) -> Vec<serde_json::Value> {
    store
        .keys()
        .into_iter()
        .filter(|k| k.starts_with("changelogs/"))
        .map(|k| serde_json::from_slice(&store.get(&k).unwrap()).unwrap())
        .collect()
}

pub fn doc_keys(store: &InMemoryObjectStore, document_number: &str) -> Vec<String> {
    let prefix = format!("{}/", document_number);
    store
        .keys()
        .into_iter()
        .filter(|k| k.starts_with(&prefix))
        .collect()
}

pub async fn statuses(jobs: &SqlitePublicationJobStore, document_number: &str) -> Vec<JobStatus> {
    jobs.find_by_document_number(document_number)
        .await
        .unwrap()
        .into_iter()
        .map(|j| j.status)
        .collect()
}
