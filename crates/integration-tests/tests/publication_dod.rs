//! Publication Definition of Done (DoD) Integration Tests
//!
//! End-to-end over the SQLite job store and document table with an
//! in-memory object store.

mod common;

use common::{changelogs, doc_keys, engine, publishable, statuses};
use portal_sync_core::domain::{JobStatus, PortalPublicationStatus, PublicationJobType};
use portal_sync_core::port::object_store::mocks::{FailOn, StoreCall};
use portal_sync_core::port::{DocumentRepository, PublicationJobStore, StorageError};
use serde_json::json;

async fn portal_status(engine: &common::Engine, doc: &str) -> PortalPublicationStatus {
    engine
        .documents
        .find_by_document_number(doc)
        .await
        .unwrap()
        .unwrap()
        .portal_publication_status
}

/// DoD 1: DELETE of a never-published document succeeds without mutations
#[tokio::test]
async fn test_delete_without_objects_is_idempotent() {
    let e = engine().await;
    e.documents.upsert(&publishable("KORE700012023", &[])).await.unwrap();

    e.trigger.withdraw("KORE700012023").await.unwrap();
    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(
        statuses(&e.jobs, "KORE700012023").await,
        vec![JobStatus::Succeeded]
    );
    assert!(e.store.mutations().is_empty());
    assert_eq!(
        portal_status(&e, "KORE700012023").await,
        PortalPublicationStatus::Withdrawn
    );
}

/// DoD 2: a second pass without new jobs performs no store calls
#[tokio::test]
async fn test_publish_converges() {
    let e = engine().await;
    e.documents.upsert(&publishable("doc", &["a.png"])).await.unwrap();
    e.trigger.publish("doc").await.unwrap();

    let first = e.executor.execute_pending_jobs().await.unwrap();
    assert_eq!(first.succeeded, 1);
    e.store.clear_calls();

    let second = e.executor.execute_pending_jobs().await.unwrap();
    assert_eq!(second.fetched, 0);
    assert!(e.store.calls().is_empty());
    assert_eq!(changelogs(&e.store).len(), 1);
}

/// DoD 3: a dropped attachment is deleted, kept ones are never deleted
#[tokio::test]
async fn test_attachment_diff() {
    let e = engine().await;
    e.documents
        .upsert(&publishable("doc", &["a.png", "b.png"]))
        .await
        .unwrap();
    e.trigger.publish("doc").await.unwrap();
    e.executor.execute_pending_jobs().await.unwrap();
    assert_eq!(
        doc_keys(&e.store, "doc"),
        vec!["doc/a.png", "doc/b.png", "doc/doc.xml"]
    );

    e.documents.upsert(&publishable("doc", &["a.png"])).await.unwrap();
    e.trigger.publish("doc").await.unwrap();
    e.store.clear_calls();
    e.executor.execute_pending_jobs().await.unwrap();

    let mutations = e.store.mutations();
    assert!(mutations.contains(&StoreCall::Put("doc/doc.xml".into())));
    assert!(mutations.contains(&StoreCall::Put("doc/a.png".into())));
    assert!(mutations.contains(&StoreCall::Delete("doc/b.png".into())));
    assert!(!mutations.contains(&StoreCall::Delete("doc/a.png".into())));
    assert_eq!(doc_keys(&e.store, "doc"), vec!["doc/a.png", "doc/doc.xml"]);
}

/// DoD 4: the last job of each document decides its manifest side
#[tokio::test]
async fn test_net_effect_ordering() {
    let e = engine().await;
    e.documents.upsert(&publishable("doc1", &[])).await.unwrap();
    e.documents.upsert(&publishable("doc2", &[])).await.unwrap();
    for (doc, job_type) in [
        ("doc1", PublicationJobType::Publish),
        ("doc2", PublicationJobType::Delete),
        ("doc1", PublicationJobType::Publish),
        ("doc2", PublicationJobType::Publish),
        ("doc1", PublicationJobType::Delete),
        ("doc2", PublicationJobType::Publish),
    ] {
        e.trigger.enqueue(doc, job_type).await.unwrap();
    }

    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.succeeded, 6);
    assert_eq!(
        changelogs(&e.store),
        vec![json!({"changed": ["doc2/doc2.xml"], "deleted": ["doc1/doc1.xml"]})]
    );
    assert_eq!(portal_status(&e, "doc1").await, PortalPublicationStatus::Withdrawn);
    assert_eq!(portal_status(&e, "doc2").await, PortalPublicationStatus::Published);
}

/// DoD 5: one document's store failure does not abort the batch
#[tokio::test]
async fn test_error_isolation() {
    let e = engine().await;
    e.documents.upsert(&publishable("A", &[])).await.unwrap();
    e.store.insert("B/B.xml", b"old".to_vec());
    e.store
        .fail_on(FailOn::Put, "A/", StorageError::Io("connection reset".into()));

    e.trigger.publish("A").await.unwrap();
    e.trigger.withdraw("B").await.unwrap();
    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 1);
    assert!(matches!(
        statuses(&e.jobs, "A").await.as_slice(),
        [JobStatus::Failed { retryable: true, .. }]
    ));
    assert_eq!(statuses(&e.jobs, "B").await, vec![JobStatus::Succeeded]);
    assert_eq!(
        changelogs(&e.store),
        vec![json!({"changed": [], "deleted": ["B/B.xml"]})]
    );
    assert_eq!(portal_status(&e, "A").await, PortalPublicationStatus::Unpublished);
}

/// DoD 6: invalid aggregates leave store and portal status untouched
#[tokio::test]
async fn test_validation_failure_does_not_mutate() {
    let e = engine().await;
    let mut invalid = publishable("doc", &["a.png"]);
    invalid.core_data.court = None;
    invalid.portal_publication_status = PortalPublicationStatus::Published;
    e.documents.upsert(&invalid).await.unwrap();
    e.store.insert("doc/doc.xml", b"previous".to_vec());

    e.trigger.publish("doc").await.unwrap();
    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.failed, 1);
    match &statuses(&e.jobs, "doc").await[..] {
        [JobStatus::Failed { retryable, reason }] => {
            assert!(!retryable);
            assert!(reason.contains("court"), "reason: {}", reason);
        }
        other => panic!("unexpected statuses {:?}", other),
    }
    assert!(e.store.calls().is_empty());
    assert_eq!(e.store.get("doc/doc.xml"), Some(b"previous".to_vec()));
    assert_eq!(portal_status(&e, "doc").await, PortalPublicationStatus::Published);
}

/// DoD 7: republish of document "1" drops bild2.png
#[tokio::test]
async fn test_concrete_republish_scenario() {
    let e = engine().await;
    e.documents.upsert(&publishable("1", &["bild1.png"])).await.unwrap();
    e.store.insert("1/1.xml", b"old".to_vec());
    e.store.insert("1/bild1.png", b"old".to_vec());
    e.store.insert("1/bild2.png", b"old".to_vec());

    e.trigger.publish("1").await.unwrap();
    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(
        e.store.mutations(),
        vec![
            StoreCall::Put("1/1.xml".into()),
            StoreCall::Put("1/bild1.png".into()),
            StoreCall::Delete("1/bild2.png".into()),
            StoreCall::Put(report.changelog_key.clone().unwrap()),
        ]
    );
    assert_eq!(
        changelogs(&e.store),
        vec![json!({"changed": ["1/1.xml", "1/bild1.png"], "deleted": ["1/bild2.png"]})]
    );
    let xml = String::from_utf8(e.store.get("1/1.xml").unwrap()).unwrap();
    assert!(xml.starts_with("<?xml"));
    assert_eq!(portal_status(&e, "1").await, PortalPublicationStatus::Published);
}

/// DoD 8: the nightly resync uploads change_all even with nothing pending
#[tokio::test]
async fn test_nightly_resync_without_jobs() {
    let e = engine().await;

    let key = e.executor.publish_nightly_changelog().await.unwrap();

    assert!(key.starts_with("changelogs/2026-10-14T02:00:00.000Z-"));
    assert!(key.ends_with(".json"));
    assert_eq!(changelogs(&e.store), vec![json!({"change_all": true})]);
    assert!(e.jobs.fetch_pending().await.unwrap().is_empty());
}

/// DoD 9: an all-failed batch uploads no changelog
#[tokio::test]
async fn test_all_failed_batch_uploads_nothing() {
    let e = engine().await;
    e.trigger.publish("missing").await.unwrap();

    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.failed, 1);
    assert!(report.changelog_key.is_none());
    assert!(changelogs(&e.store).is_empty());
}

/// DoD 10: invalid document numbers never reach the queue
#[tokio::test]
async fn test_trigger_rejects_unusable_document_numbers() {
    let e = engine().await;

    for bad in ["", "a/b", "..", "with space", "changelogs"] {
        assert!(e.trigger.publish(bad).await.is_err(), "accepted {:?}", bad);
    }
    assert!(e.jobs.fetch_pending().await.unwrap().is_empty());
}
