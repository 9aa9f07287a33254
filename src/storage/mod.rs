//! Local key-value store for NeuroNarrative
//!
//! Everything the client keeps between runs (cached conversations, the
//! session index, evaluation metrics, crisis alerts and display preferences)
//! lives in one embedded `sled` database as JSON values.
//!
//! Reads are forgiving: a missing key or a value that no longer decodes is
//! reported as absent so callers fall back to defaults. Writes are flushed
//! before returning.

use crate::config::StorageConfig;
use crate::error::{NarrativeError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::path::Path;

pub mod keys;
pub mod types;

pub use types::Preferences;

/// Embedded store shared by the session cache and the crisis filter
///
/// Cloning is cheap; clones share the same underlying database.
#[derive(Clone)]
pub struct LocalStore {
    db: Db,
}

impl LocalStore {
    /// Open or create a store at `path`
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use neuronarrative::storage::LocalStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = LocalStore::open(dir.path().join("store")).unwrap();
    /// assert!(store.read::<String>("missing").is_none());
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NarrativeError::Storage(format!("Failed to create store directory: {}", e))
            })?;
        }
        let db = sled::open(path)
            .map_err(|e| NarrativeError::Storage(format!("Failed to open store: {}", e)))?;
        tracing::debug!("Opened local store at {}", path.display());
        Ok(Self { db })
    }

    /// Open a throwaway store that is removed when the last clone drops
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if the database cannot be created
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| NarrativeError::Storage(format!("Failed to open store: {}", e)))?;
        Ok(Self { db })
    }

    /// Open the store named by the configuration, or the platform data dir
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if no data directory can be
    /// determined or the database cannot be opened
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        if let Some(path) = &config.path {
            return Self::open(path);
        }

        let proj_dirs = ProjectDirs::from("org", "neuronarrative", "neuronarrative")
            .ok_or_else(|| NarrativeError::Storage("Could not determine data directory".into()))?;
        Self::open(proj_dirs.data_dir().join("store"))
    }

    /// Read and decode the value at `key`
    ///
    /// Returns `None` when the key is missing or the stored value cannot be
    /// decoded; the latter is logged.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.db.get(key.as_bytes()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read {} from local store: {}", key, e);
                return None;
            }
        };

        decode(key, &bytes)
    }

    /// Read the value at `key`, or its default
    pub fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.read(key).unwrap_or_default()
    }

    /// Encode and store `value` at `key`, replacing what was there
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if serialization, insertion or
    /// flushing fails
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| NarrativeError::Storage(format!("Serialization failed: {}", e)))?;
        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| NarrativeError::Storage(format!("Insert failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| NarrativeError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    /// Atomically replace the value at `key` with `f` applied to it
    ///
    /// `f` sees the current value (`None` if missing or undecodable) and
    /// returns the new one; returning `None` removes the key. `f` may run more
    /// than once when another writer races it, so it must not have side
    /// effects beyond building the new value. Returns the value now stored.
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if serialization, the update or
    /// flushing fails
    pub fn update<T, F>(&self, key: &str, mut f: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Option<T>) -> Option<T>,
    {
        let mut failure = None;
        let updated = self
            .db
            .update_and_fetch(key.as_bytes(), |old| {
                failure = None;
                let current = old.and_then(|bytes| decode::<T>(key, bytes));
                match f(current).map(|value| serde_json::to_vec(&value)).transpose() {
                    Ok(next) => next,
                    Err(e) => {
                        failure = Some(e);
                        old.map(|bytes| bytes.to_vec())
                    }
                }
            })
            .map_err(|e| NarrativeError::Storage(format!("Update failed: {}", e)))?;

        if let Some(e) = failure {
            return Err(NarrativeError::Storage(format!("Serialization failed: {}", e)).into());
        }
        self.db
            .flush()
            .map_err(|e| NarrativeError::Storage(format!("Flush failed: {}", e)))?;
        Ok(updated.and_then(|bytes| decode(key, &bytes)))
    }

    /// Store raw bytes at `key`
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if insertion fails
    pub fn write_raw(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| NarrativeError::Storage(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    /// Remove `key`; removing a missing key is not an error
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if the removal fails
    pub fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| NarrativeError::Storage(format!("Remove failed: {}", e)))?;
        Ok(())
    }

    /// All keys starting with `prefix`, in byte order
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.db
            .scan_prefix(prefix.as_bytes())
            .keys()
            .filter_map(|key| match key {
                Ok(key) => String::from_utf8(key.to_vec()).ok(),
                Err(e) => {
                    tracing::warn!("Failed to scan local store: {}", e);
                    None
                }
            })
            .collect()
    }
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Option<T> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Discarding undecodable value at {}: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Default)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_write_then_read() {
        let store = LocalStore::temporary().unwrap();
        let sample = Sample {
            name: "a".to_string(),
            count: 2,
        };
        store.write("sample", &sample).unwrap();
        assert_eq!(store.read::<Sample>("sample"), Some(sample));
    }

    #[test]
    fn test_missing_key_reads_as_none() {
        let store = LocalStore::temporary().unwrap();
        assert!(store.read::<Sample>("nope").is_none());
        assert_eq!(store.read_or_default::<Sample>("nope"), Sample::default());
    }

    #[test]
    fn test_corrupt_value_reads_as_none() {
        let store = LocalStore::temporary().unwrap();
        store.write_raw("broken", b"{not json").unwrap();
        assert!(store.read::<Sample>("broken").is_none());
        assert_eq!(store.read_or_default::<Vec<u32>>("broken"), Vec::<u32>::new());
    }

    #[test]
    fn test_write_overwrites() {
        let store = LocalStore::temporary().unwrap();
        store.write("n", &1u32).unwrap();
        store.write("n", &7u32).unwrap();
        assert_eq!(store.read::<u32>("n"), Some(7));
    }

    #[test]
    fn test_update_applies_to_current_value() {
        let store = LocalStore::temporary().unwrap();
        let first = store
            .update("list", |current: Option<Vec<u32>>| {
                let mut list = current.unwrap_or_default();
                list.push(1);
                Some(list)
            })
            .unwrap();
        assert_eq!(first, Some(vec![1]));

        store
            .update("list", |current: Option<Vec<u32>>| {
                let mut list = current.unwrap_or_default();
                list.push(2);
                Some(list)
            })
            .unwrap();
        assert_eq!(store.read::<Vec<u32>>("list"), Some(vec![1, 2]));

        let removed = store.update("list", |_: Option<Vec<u32>>| None).unwrap();
        assert!(removed.is_none());
        assert!(store.read::<Vec<u32>>("list").is_none());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let store = LocalStore::temporary().unwrap();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..100 {
                        store
                            .update("counter", |n: Option<u32>| Some(n.unwrap_or(0) + 1))
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(store.read::<u32>("counter"), Some(400));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = LocalStore::temporary().unwrap();
        store.write("gone", &true).unwrap();
        store.remove("gone").unwrap();
        store.remove("gone").unwrap();
        assert!(store.read::<bool>("gone").is_none());
    }

    #[test]
    fn test_keys_with_prefix() {
        let store = LocalStore::temporary().unwrap();
        store.write("chat:1:rita", &0u8).unwrap();
        store.write("chat:1:naveen", &0u8).unwrap();
        store.write("chat:2:rita", &0u8).unwrap();
        let keys = store.keys_with_prefix("chat:1:");
        assert_eq!(keys, vec!["chat:1:naveen", "chat:1:rita"]);
    }

    #[test]
    fn test_open_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store");
        {
            let store = LocalStore::open(&path).unwrap();
            store.write("k", &"v").unwrap();
        }
        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.read::<String>("k"), Some("v".to_string()));
    }

    #[test]
    fn test_from_config_uses_explicit_path() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            path: Some(dir.path().join("cfg-store")),
        };
        let store = LocalStore::from_config(&config).unwrap();
        store.write("x", &1u8).unwrap();
        assert!(dir.path().join("cfg-store").exists());
    }
}
