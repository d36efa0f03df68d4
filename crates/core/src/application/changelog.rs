// Change Manifest Builder
// Net effect of one batch, per document, for downstream cache invalidation

use crate::application::reconciler::ReconcileOutcome;
use crate::domain::{DocumentNumber, CHANGELOG_PREFIX};
use serde::Serialize;
use std::collections::HashMap;

/// Per-batch changelog: `{"changed": [...], "deleted": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeManifest {
    pub changed: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeManifest {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Nightly full-resync signal: `{"change_all": true}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullResyncChangelog {
    pub change_all: bool,
}

impl FullResyncChangelog {
    pub fn new() -> Self {
        Self { change_all: true }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl Default for FullResyncChangelog {
    fn default() -> Self {
        Self::new()
    }
}

/// Dated changelog key, e.g. `changelogs/2026-10-14T02:00:00.000Z-portal-sync-1-000003.json`
///
/// The timestamp comes first so keys sort by upload time. `uploader` and
/// `seq` keep two uploads within the same millisecond apart; characters of
/// `uploader` outside `[A-Za-z0-9_-]` become `_`.
pub fn changelog_key(now_millis: i64, uploader: &str, seq: u64) -> String {
    let stamp = chrono::DateTime::from_timestamp_millis(now_millis)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let uploader: String = uploader
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}-{}-{:06}.json", CHANGELOG_PREFIX, stamp, uploader, seq)
}

/// Classification of a document in the final changelog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Changed,
    Deleted,
}

#[derive(Debug, Clone)]
struct DocumentChange {
    kind: ChangeKind,
    // position of the last successful job for this document
    seq: u64,
    changed: Vec<String>,
    deleted: Vec<String>,
}

/// Accumulator keyed by document number
///
/// The last successful job of a document decides its classification; an
/// earlier entry is overwritten, never duplicated. Keys merge so that a key
/// is listed in at most one of the two arrays.
#[derive(Debug, Default)]
pub struct ChangelogBuilder {
    entries: HashMap<DocumentNumber, DocumentChange>,
    next_seq: u64,
}

impl ChangelogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a successful PUBLISH
    pub fn record_published(&mut self, document_number: &str, outcome: &ReconcileOutcome) {
        self.record(document_number, ChangeKind::Changed, outcome);
    }

    /// Register a successful DELETE
    pub fn record_deleted(&mut self, document_number: &str, outcome: &ReconcileOutcome) {
        self.record(document_number, ChangeKind::Deleted, outcome);
    }

    fn record(&mut self, document_number: &str, kind: ChangeKind, outcome: &ReconcileOutcome) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let (prev_changed, prev_deleted) = match self.entries.remove(document_number) {
            Some(prev) => (prev.changed, prev.deleted),
            None => (Vec::new(), Vec::new()),
        };

        let mut changed = outcome.put.clone();
        changed.extend(
            prev_changed
                .into_iter()
                .filter(|k| !outcome.deleted.contains(k) && !outcome.put.contains(k)),
        );

        let mut deleted: Vec<String> = prev_deleted
            .into_iter()
            .filter(|k| !outcome.put.contains(k) && !outcome.deleted.contains(k))
            .collect();
        deleted.extend(outcome.deleted.iter().cloned());

        self.entries.insert(
            document_number.to_string(),
            DocumentChange {
                kind,
                seq,
                changed,
                deleted,
            },
        );
    }

    /// Final classification of a document, if any job for it succeeded
    pub fn classification(&self, document_number: &str) -> Option<ChangeKind> {
        self.entries.get(document_number).map(|e| e.kind)
    }

    pub fn document_count(&self) -> usize {
        self.entries.len()
    }

    /// Expand entries into concrete keys, in processing order
    pub fn build(&self) -> ChangeManifest {
        let mut entries: Vec<&DocumentChange> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);

        let mut manifest = ChangeManifest::default();
        for entry in entries {
            manifest.changed.extend(entry.changed.iter().cloned());
            manifest.deleted.extend(entry.deleted.iter().cloned());
        }
        manifest
    }
}
