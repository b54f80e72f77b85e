//! Durable entry storage for record stores.
//!
//! A store persists one entry per record, logically `{id, backup_text}`.
//! The physical encoding is this module's concern: [`DirectoryStorage`]
//! keeps one JSON document per entry under a flat directory, and
//! [`MemoryStorage`] backs tests and ephemeral stores.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StoreError;

/// One durable entry: a record identity and its backup text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Record identity.
    pub id: String,
    /// Compact reconstruction text.
    pub backup: String,
}

impl StoredEntry {
    /// Create an entry.
    pub fn new(id: impl Into<String>, backup: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            backup: backup.into(),
        }
    }
}

/// Backing storage for one record store.
///
/// Implementations provide at-least-once durability for the four
/// operations below; everything richer (uniqueness, quarantine, ordering)
/// lives in the store itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Fetch one entry by record identity.
    async fn get(&self, id: &str) -> Result<Option<StoredEntry>, StoreError>;

    /// Write one entry, replacing any previous version under the same id.
    async fn put(&self, entry: StoredEntry) -> Result<(), StoreError>;

    /// Delete one entry by record identity. Deleting a missing entry is
    /// not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// List every stored entry. Order is unspecified.
    async fn list_all(&self) -> Result<Vec<StoredEntry>, StoreError>;
}

/// File-per-entry storage under a flat directory.
///
/// Record identities are URLs and generated ids, so file names are the
/// SHA-256 hex of the id; the id itself lives inside the JSON document.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    dir: PathBuf,
}

impl DirectoryStorage {
    /// Open a storage directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OpenFailed`] when the directory cannot be
    /// created or accessed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::OpenFailed {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
        debug!("Opened record storage at {}", dir.display());
        Ok(Self { dir })
    }

    /// The directory entries are stored under.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        let digest = Sha256::digest(id.as_bytes());
        self.dir.join(format!("{digest:x}.json"))
    }
}

#[async_trait]
impl RecordStorage for DirectoryStorage {
    async fn get(&self, id: &str) -> Result<Option<StoredEntry>, StoreError> {
        let path = self.entry_path(id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    id: id.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        let entry: StoredEntry =
            serde_json::from_str(&raw).map_err(|e| StoreError::ReadFailed {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(entry))
    }

    async fn put(&self, entry: StoredEntry) -> Result<(), StoreError> {
        let path = self.entry_path(&entry.id);
        let json = serde_json::to_string_pretty(&entry).map_err(|e| StoreError::WriteFailed {
            id: entry.id.clone(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| StoreError::WriteFailed {
                id: entry.id.clone(),
                reason: e.to_string(),
            })
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.entry_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::DeleteFailed {
                id: id.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn list_all(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let mut read_dir =
            tokio::fs::read_dir(&self.dir)
                .await
                .map_err(|e| StoreError::ListFailed {
                    reason: e.to_string(),
                })?;

        let mut entries = Vec::new();
        loop {
            let dir_entry = match read_dir.next_entry().await {
                Ok(Some(dir_entry)) => dir_entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(StoreError::ListFailed {
                        reason: e.to_string(),
                    });
                }
            };

            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            // A single unreadable document must not take the whole listing
            // down; the store quarantines what it can and load continues.
            match tokio::fs::read_to_string(&path).await {
                Ok(raw) => match serde_json::from_str::<StoredEntry>(&raw) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => warn!("Skipping malformed entry {}: {}", path.display(), e),
                },
                Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        Ok(entries)
    }
}

/// In-memory storage for tests and ephemeral stores.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStorage for MemoryStorage {
    async fn get(&self, id: &str) -> Result<Option<StoredEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(id)
            .map(|backup| StoredEntry::new(id, backup.clone())))
    }

    async fn put(&self, entry: StoredEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.id, entry.backup);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .map(|(id, backup)| StoredEntry::new(id.clone(), backup.clone()))
            .collect())
    }
}
