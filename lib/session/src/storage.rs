//! Key/value storage backends for session state.
//!
//! A backend persists string values under fully qualified keys. Backends
//! know nothing about namespaces or the meaning of the values; the
//! `CredentialStore` builds keys and interprets values.

use crate::error::StorageError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use std::collections::{BTreeMap, HashMap};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Trait for session state persistence.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Loads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    async fn load(&self, key: &str) -> Result<Option<String>, Report<StorageError>>;

    /// Stores `value` under `key`, or removes the key when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    async fn save(&self, key: &str, value: Option<&str>) -> Result<(), Report<StorageError>>;

    /// Returns true if stored values survive a process restart.
    fn is_persistent(&self) -> bool;
}

/// Non-persistent storage held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Option<&str>) -> Result<(), Report<StorageError>> {
        let mut entries = self.entries.lock().await;
        match value {
            Some(value) => {
                entries.insert(key.to_string(), value.to_string());
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// Durable storage in a single JSON document on disk.
///
/// Every save rewrites the document through a uniquely named temporary file
/// in the same directory and a rename, so a reader never observes a
/// partially written state. Writers in different processes can still lose
/// each other's updates; the last rename wins.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Creates a file-backed store at `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: &std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }

    async fn read_document(&self) -> Result<BTreeMap<String, String>, Report<StorageError>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(&e).into()),
        };
        if bytes.is_empty() {
            return Ok(BTreeMap::new());
        }
        let document = serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(document)
    }

    async fn write_document(
        &self,
        document: &BTreeMap<String, String>,
    ) -> Result<(), Report<StorageError>> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|e| StorageError::Corrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| self.io_error(&e))?;

        // Unique temp name per write so concurrent writers never share a file.
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?
        .map_err(|e| self.io_error(&e))?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.remove(key))
    }

    async fn save(&self, key: &str, value: Option<&str>) -> Result<(), Report<StorageError>> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let changed = match value {
            Some(value) => {
                let previous = document.insert(key.to_string(), value.to_string());
                previous.as_deref() != Some(value)
            }
            None => document.remove(key).is_some(),
        };
        if changed {
            self.write_document(&document).await?;
        }
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
