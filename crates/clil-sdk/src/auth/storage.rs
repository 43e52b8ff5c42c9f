//! Key-value session persistence
//!
//! Storage is keyed by plain strings. Every write goes through
//! `replace_items`, which applies its insertions and removals as one unit so
//! a reader never observes an access token without the refresh token and
//! identity stored alongside it.

use super::types::StorageError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the persisted session inside the storage directory
pub const SESSION_FILE: &str = "session.json";

/// Durable string key-value storage for session data
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `set` and drop `remove` in a single step
    ///
    /// Either every change lands or none does. Absent keys in `remove` are
    /// ignored.
    async fn replace_items(
        &self,
        set: &[(&str, String)],
        remove: &[&str],
    ) -> Result<(), StorageError>;

    async fn set_items(&self, items: &[(&str, String)]) -> Result<(), StorageError> {
        self.replace_items(items, &[]).await
    }

    async fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.replace_items(&[], keys).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.set_items(&[(key, value)]).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.remove_items(&[key]).await
    }
}

/// Process-local storage, lost on exit
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn replace_items(
        &self,
        set: &[(&str, String)],
        remove: &[&str],
    ) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        apply(&mut entries, set, remove);
        Ok(())
    }
}

/// Apply a replacement to a document, returning whether anything changed
fn apply(
    document: &mut BTreeMap<String, String>,
    set: &[(&str, String)],
    remove: &[&str],
) -> bool {
    let mut changed = false;
    for key in remove {
        changed |= document.remove(*key).is_some();
    }
    for (key, value) in set {
        changed |= document.insert((*key).to_string(), value.clone()).as_ref() != Some(value);
    }
    changed
}

/// Storage backed by a single JSON document on disk
///
/// Every write rewrites the whole document through a temporary file and
/// renames it into place. A document that cannot be parsed is discarded and
/// treated as an empty session.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSessionStorage {
    /// Create storage rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        Ok(Self {
            path: dir.join(SESSION_FILE),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Ok(BTreeMap::new()),
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the document, discarding it when it is not valid JSON
    ///
    /// Callers hold `write_lock` so the removal cannot race a rename.
    async fn load_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_document().await {
            Err(StorageError::Serde(e)) => {
                warn!(
                    path = %self.path.display(),
                    "Discarding unreadable session file: {}", e
                );
                self.remove_document().await?;
                Ok(BTreeMap::new())
            }
            result => result,
        }
    }

    async fn remove_document(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if document.is_empty() {
            self.remove_document().await?;
            debug!(path = %self.path.display(), "Removed session file");
            return Ok(());
        }

        let data = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        restrict_permissions(&tmp_path).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!(path = %self.path.display(), keys = document.len(), "Wrote session file");
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document().await?;
        Ok(document.remove(key))
    }

    async fn replace_items(
        &self,
        set: &[(&str, String)],
        remove: &[&str],
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document().await?;
        if !apply(&mut document, set, remove) {
            return Ok(());
        }
        self.write_document(&document).await
    }
}
