//! Reconciliation Edge Cases
//!
//! Prefix collisions, vanished objects, listing failures and a full run
//! against the filesystem object store.

mod common;

use std::sync::Arc;

use common::{changelogs, doc_keys, engine, executor, publishable, sqlite, statuses};
use portal_sync_core::application::PortalXmlTransformer;
use portal_sync_core::domain::{
    Attachment, JobStatus, PortalPublicationStatus, PublicationJob, PublicationJobType,
};
use portal_sync_core::port::object_store::mocks::{FailOn, StoreCall};
use portal_sync_core::port::{DocumentRepository, PublicationJobStore, StorageError, TimeProvider};
use portal_sync_infra_fs::LocalFsObjectStore;
use serde_json::json;

#[tokio::test]
async fn test_prefix_of_other_document_is_untouched() {
    let e = engine().await;
    e.documents.upsert(&publishable("1", &[])).await.unwrap();
    e.store.insert("10/10.xml", b"other".to_vec());
    e.store.insert("1/stale.png", b"stale".to_vec());

    e.trigger.publish("1").await.unwrap();
    e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(e.store.get("10/10.xml"), Some(b"other".to_vec()));
    assert_eq!(doc_keys(&e.store, "1"), vec!["1/1.xml"]);
    assert!(!e
        .store
        .calls()
        .iter()
        .any(|c| matches!(c, StoreCall::Delete(k) if k.starts_with("10/"))));
}

#[tokio::test]
async fn test_object_vanishing_during_delete_still_succeeds() {
    let e = engine().await;
    e.documents.upsert(&publishable("1", &[])).await.unwrap();
    e.store.insert("1/gone.png", b"x".to_vec());
    e.store.fail_on(
        FailOn::Delete,
        "1/gone.png",
        StorageError::NotFound("1/gone.png".into()),
    );

    e.trigger.publish("1").await.unwrap();
    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(
        changelogs(&e.store),
        vec![json!({"changed": ["1/1.xml"], "deleted": ["1/gone.png"]})]
    );
}

#[tokio::test]
async fn test_listing_failure_keeps_publication_status() {
    let e = engine().await;
    let mut doc = publishable("1", &[]);
    doc.portal_publication_status = PortalPublicationStatus::Published;
    e.documents.upsert(&doc).await.unwrap();
    e.store.insert("1/1.xml", b"live".to_vec());
    e.store
        .fail_on(FailOn::List, "1/", StorageError::Io("timeout".into()));

    e.trigger.withdraw("1").await.unwrap();
    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.failed, 1);
    assert!(matches!(
        statuses(&e.jobs, "1").await.as_slice(),
        [JobStatus::Failed { retryable: true, .. }]
    ));
    assert_eq!(e.store.get("1/1.xml"), Some(b"live".to_vec()));
    let stored = e.documents.find_by_document_number("1").await.unwrap().unwrap();
    assert_eq!(stored.portal_publication_status, PortalPublicationStatus::Published);
}

#[tokio::test]
async fn test_attachment_named_like_the_xml_does_not_replace_it() {
    let e = engine().await;
    let mut doc = publishable("1", &[]);
    doc.attachments = vec![
        Attachment::new("1.xml", b"not xml".to_vec()),
        Attachment::new("bild1.png", vec![1]),
    ];
    e.documents.upsert(&doc).await.unwrap();

    e.trigger.publish("1").await.unwrap();
    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.succeeded, 1);
    let xml = String::from_utf8(e.store.get("1/1.xml").unwrap()).unwrap();
    assert!(xml.starts_with("<?xml"));
    assert_eq!(doc_keys(&e.store, "1"), vec!["1/1.xml", "1/bild1.png"]);
}

#[tokio::test]
async fn test_republish_after_withdrawal() {
    let e = engine().await;
    e.documents.upsert(&publishable("1", &["a.png"])).await.unwrap();

    e.trigger.publish("1").await.unwrap();
    e.executor.execute_pending_jobs().await.unwrap();
    e.trigger.withdraw("1").await.unwrap();
    e.executor.execute_pending_jobs().await.unwrap();
    assert!(doc_keys(&e.store, "1").is_empty());

    e.trigger.publish("1").await.unwrap();
    e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(doc_keys(&e.store, "1"), vec!["1/1.xml", "1/a.png"]);
    let stored = e.documents.find_by_document_number("1").await.unwrap().unwrap();
    assert_eq!(stored.portal_publication_status, PortalPublicationStatus::Published);
    assert_eq!(changelogs(&e.store).len(), 3);
}

#[tokio::test]
async fn test_job_for_changelog_directory_keeps_history() {
    let e = engine().await;
    e.executor.publish_nightly_changelog().await.unwrap();
    e.documents.upsert(&publishable("1", &[])).await.unwrap();
    e.trigger.publish("1").await.unwrap();
    e.executor.execute_pending_jobs().await.unwrap();
    assert_eq!(changelogs(&e.store).len(), 2);

    // written straight to the queue, bypassing the trigger
    let job = PublicationJob::new(
        "direct-1",
        e.clock.now_millis(),
        "changelogs",
        PublicationJobType::Delete,
    );
    e.jobs.insert(&job).await.unwrap();
    let report = e.executor.execute_pending_jobs().await.unwrap();

    assert_eq!(report.failed, 1);
    assert!(report.changelog_key.is_none());
    match &statuses(&e.jobs, "changelogs").await[..] {
        [JobStatus::Failed { retryable, .. }] => assert!(!retryable),
        other => panic!("unexpected statuses {:?}", other),
    }
    assert_eq!(changelogs(&e.store).len(), 2);
    assert!(!e
        .store
        .calls()
        .iter()
        .any(|c| matches!(c, StoreCall::Delete(_))));
}

#[tokio::test]
async fn test_filesystem_store_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = sqlite().await;
    let store = Arc::new(LocalFsObjectStore::new(dir.path()));
    let clock = common::clock();
    let exec = executor(
        &db,
        store,
        Arc::new(PortalXmlTransformer::new()),
        clock.clone(),
        "executor-fs",
    );

    let enqueue = |id: &str, job_type| {
        PublicationJob::new(id, clock.now_millis(), "KORE1", job_type)
    };

    // publish with two attachments
    db.documents
        .upsert(&publishable("KORE1", &["a.png", "b.png"]))
        .await
        .unwrap();
    db.jobs
        .insert(&enqueue("j1", PublicationJobType::Publish))
        .await
        .unwrap();
    let first = exec.execute_pending_jobs().await.unwrap();
    assert_eq!(first.succeeded, 1);
    for file in ["KORE1.xml", "a.png", "b.png"] {
        assert!(dir.path().join("KORE1").join(file).is_file(), "{}", file);
    }

    // republish without b.png
    db.documents
        .upsert(&publishable("KORE1", &["a.png"]))
        .await
        .unwrap();
    db.jobs
        .insert(&enqueue("j2", PublicationJobType::Publish))
        .await
        .unwrap();
    let second = exec.execute_pending_jobs().await.unwrap();
    assert!(!dir.path().join("KORE1/b.png").exists());
    assert!(dir.path().join("KORE1/a.png").is_file());

    let manifest_path = dir.path().join(second.changelog_key.unwrap());
    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(manifest_path).unwrap()).unwrap();
    assert_eq!(
        manifest,
        json!({"changed": ["KORE1/KORE1.xml", "KORE1/a.png"], "deleted": ["KORE1/b.png"]})
    );

    // withdraw removes the whole prefix directory
    db.jobs
        .insert(&enqueue("j3", PublicationJobType::Delete))
        .await
        .unwrap();
    let third = exec.execute_pending_jobs().await.unwrap();
    assert_eq!(third.succeeded, 1);
    assert!(!dir.path().join("KORE1").exists());
    assert_eq!(std::fs::read_dir(dir.path().join("changelogs")).unwrap().count(), 3);
}
