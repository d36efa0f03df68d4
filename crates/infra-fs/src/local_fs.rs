// Local Filesystem ObjectStore
// Key `a/b/c.xml` maps to `{root}/a/b/c.xml`

use async_trait::async_trait;
use portal_sync_core::port::{ObjectStore, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const TEMP_FILE_PREFIX: &str = ".portal-sync-tmp-";

/// Object store backed by a directory
///
/// Writes go to a temp file in the target directory and are renamed into
/// place, so readers never observe a partially written object.
pub struct LocalFsObjectStore {
    root: PathBuf,
}

impl LocalFsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Remove now-empty parent directories up to the root (best effort)
    async fn prune_empty_dirs(&self, from: &Path) {
        let mut dir = from.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(current).await.is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

#[async_trait]
impl ObjectStore for LocalFsObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;

        // directory part of the prefix; the rest is a plain string filter
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.root.join(dir_part)
        };

        let mut keys = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&dir, e)),
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_error(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if entry.file_name().to_string_lossy().starts_with(TEMP_FILE_PREFIX) {
                    continue;
                }
                match key_of(&self.root, &path) {
                    Some(key) if key.starts_with(prefix) => keys.push(key),
                    Some(_) => {}
                    None => warn!(path = %path.display(), "Skipping non UTF-8 object path"),
                }
            }
        }

        if keys.is_empty() {
            return Err(StorageError::NotFound(prefix.to_string()));
        }
        keys.sort();
        debug!(prefix = %prefix, count = keys.len(), "Listed objects");
        Ok(keys)
    }

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), StorageError> {
        let path = self.path_of(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;

        let tmp_path = parent.join(format!("{}{}", TEMP_FILE_PREFIX, uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp_path, content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(io_error(&tmp_path, e));
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(io_error(&path, e));
        }

        debug!(key = %key, bytes = content.len(), "Stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_of(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(io_error(&path, e)),
        }
        self.prune_empty_dirs(&path).await;
        debug!(key = %key, "Deleted object");
        Ok(())
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {}", path.display(), err))
}

fn key_of(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

/// Keys are relative `/`-separated paths without empty, `.` or `..` segments
///
/// A segment may not look like one of our temp files: `list` never reports
/// those, so such an object could never be found again.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = || StorageError::InvalidKey(key.to_string());
    if key.is_empty() || key.contains('\\') || key.contains('\0') {
        return Err(invalid());
    }
    if key
        .split('/')
        .any(|segment| {
            segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.starts_with(TEMP_FILE_PREFIX)
        })
    {
        return Err(invalid());
    }
    Ok(())
}

/// Like a key, but may be empty or end with `/`
fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    if trimmed.is_empty() {
        return if prefix.is_empty() {
            Ok(())
        } else {
            Err(StorageError::InvalidKey(prefix.to_string()))
        };
    }
    validate_key(trimmed).map_err(|_| StorageError::InvalidKey(prefix.to_string()))
}
