//! JSON file-backed key-value store.
//!
//! All keys live in one JSON object on disk (`{"key": "value", ...}`). Each
//! `set` rewrites the file through a temporary sibling and a rename, so a
//! crash mid-write leaves the previous file in place.
//!
//! A file that is not a JSON object reads as empty. Before the next `set`
//! replaces it, it is moved aside to a `.corrupt` sibling so its contents can
//! still be recovered by hand.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{KvStore, StorageError};

/// A [`KvStore`] persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backing file. `None` means the file exists but is unreadable
    /// as a JSON object.
    async fn load(&self) -> Result<Option<BTreeMap<String, String>>, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Some(BTreeMap::new())),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(map) => Ok(Some(map)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Store file is not a JSON object, treating as empty");
                Ok(None)
            }
        }
    }

    /// Move an unreadable store file out of the way of the next write.
    async fn quarantine(&self) -> Result<(), StorageError> {
        let corrupt = self.sibling_path("corrupt");
        fs::rename(&self.path, &corrupt)
            .await
            .map_err(|e| StorageError::io(&corrupt, e))?;
        warn!(
            path = %self.path.display(),
            moved_to = %corrupt.display(),
            "Moved unreadable store file aside"
        );
        Ok(())
    }

    fn sibling_path(&self, extension: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".");
        name.push(extension);
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load().await?.and_then(|mut map| map.remove(key)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut map = match self.load().await? {
            Some(map) => map,
            None => {
                self.quarantine().await?;
                BTreeMap::new()
            }
        };
        map.insert(key.to_string(), value.to_string());

        let data = serde_json::to_vec_pretty(&map).map_err(|e| StorageError::Encode {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let temp = self.sibling_path("tmp");
        fs::write(&temp, data)
            .await
            .map_err(|e| StorageError::io(&temp, e))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| StorageError::io(&self.path, e))?;

        debug!(path = %self.path.display(), key, "Wrote store file");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("cart.json"));
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cart.json");
        let store = FileStore::new(&path);
        store.set("k", "v").await.unwrap();
        assert!(path.exists());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("cart.json"));
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        store.set("a", "3").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("3"));
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cart.json");
        FileStore::new(&path).set("k", "[1,2]").await.unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("[1,2]"));
    }

    #[tokio::test]
    async fn test_garbage_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_garbage_file_moved_aside_before_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(&path, b"{\"theme\": \"dark\", truncated").unwrap();

        let store = FileStore::new(&path);
        store.set("k", "v").await.unwrap();

        let corrupt = dir.path().join("cart.json.corrupt");
        assert_eq!(
            std::fs::read(&corrupt).unwrap(),
            b"{\"theme\": \"dark\", truncated"
        );
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        // A healthy file is never moved aside.
        std::fs::remove_file(&corrupt).unwrap();
        store.set("k", "w").await.unwrap();
        assert!(!corrupt.exists());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("cart.json"));
        store.set("k", "v").await.unwrap();
        assert!(!dir.path().join("cart.json.tmp").exists());
    }
}
