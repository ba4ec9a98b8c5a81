//! Durable client storage.
//!
//! A small string key-value store that survives restarts, scoped to one
//! user profile. Reads and writes are synchronous; a single process is
//! assumed to own the backing file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::StorageError;

/// Serialized current user record.
pub const USER_KEY: &str = "user";
/// Last successfully searched location query.
pub const LAST_LOCATION_KEY: &str = "lastLocation";
/// Serialized list of recent search queries.
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

const STORAGE_FILE: &str = "storage.json";

/// String key-value storage shared by the stores.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys yield `Ok(None)`.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage backed by a single JSON object file in the config directory.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file inside `dir`.
    ///
    /// A corrupted file is logged and treated as empty; it is overwritten on
    /// the next write.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(STORAGE_FILE);

        let entries = if path.exists() {
            let contents =
                fs::read_to_string(&path).map_err(|e| StorageError::Read(e.to_string()))?;
            match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring corrupted storage file {:?}: {}", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened storage at {:?} ({} keys)", path, entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Write(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Write(e.to_string()))?;

        // Write to a sibling file first so a crash never leaves half a document
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StorageError::Write(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StorageError::Write(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.flush(&updated)?;
        *entries = updated;
        tracing::debug!("Stored key: {}", key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.flush(&updated)?;
        *entries = updated;
        tracing::debug!("Removed key: {}", key);
        Ok(())
    }
}

/// In-memory storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get_item(USER_KEY).unwrap(), None);
        storage.set_item(USER_KEY, r#"{"id":1}"#).unwrap();
        storage.set_item(LAST_LOCATION_KEY, "Paris").unwrap();

        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get_item(USER_KEY).unwrap().as_deref(),
            Some(r#"{"id":1}"#)
        );
        assert_eq!(
            reopened.get_item(LAST_LOCATION_KEY).unwrap().as_deref(),
            Some("Paris")
        );
    }

    #[test]
    fn test_file_storage_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set_item(USER_KEY, "x").unwrap();
        storage.remove_item(USER_KEY).unwrap();
        storage.remove_item("never-set").unwrap();
        assert_eq!(storage.get_item(USER_KEY).unwrap(), None);

        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get_item(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_storage_ignores_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), "{not json").unwrap();

        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get_item(USER_KEY).unwrap(), None);

        storage.set_item(USER_KEY, "fresh").unwrap();
        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get_item(USER_KEY).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_file_storage_failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set_item(LAST_LOCATION_KEY, "Paris").unwrap();

        // A directory in the way of the staging file makes every flush fail
        fs::create_dir(storage.path().with_extension("json.tmp")).unwrap();

        let err = storage.set_item(LAST_LOCATION_KEY, "Oslo").unwrap_err();
        assert!(matches!(err, StorageError::Write(_)));
        assert!(storage.remove_item(LAST_LOCATION_KEY).is_err());
        assert_eq!(
            storage.get_item(LAST_LOCATION_KEY).unwrap().as_deref(),
            Some("Paris")
        );

        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get_item(LAST_LOCATION_KEY).unwrap().as_deref(),
            Some("Paris")
        );
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.set_item(RECENT_SEARCHES_KEY, "[]").unwrap();
        assert_eq!(
            storage.get_item(RECENT_SEARCHES_KEY).unwrap().as_deref(),
            Some("[]")
        );
        storage.remove_item(RECENT_SEARCHES_KEY).unwrap();
        assert_eq!(storage.get_item(RECENT_SEARCHES_KEY).unwrap(), None);
    }
}
