//! Disk manager for kvrel
//!
//! This module keeps each store in its own file under the data directory.
//! A store file is a JSON list of entries; every mutation rewrites it
//! through a temporary file and a rename so it is durable when the call
//! returns.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::kv::{KvStore, StorageBackend};
use crate::config::EngineConfig;
use crate::error::Result;

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: Vec<u8>,
    value: Vec<u8>,
}

/// File-backed key-value store
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<Vec<u8>, Bytes>,
}

impl FileStore {
    /// Open a store file, treating a missing file as empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries = BTreeMap::new();

        if path.exists() {
            let data = fs::read(&path)?;
            if !data.is_empty() {
                let stored: Vec<StoredEntry> = serde_json::from_slice(&data)?;
                for entry in stored {
                    entries.insert(entry.key, Bytes::from(entry.value));
                }
            }
        }

        debug!(path = %path.display(), entries = entries.len(), "opened store");
        Ok(Self { path, entries })
    }

    /// Create (or truncate) a store file with no entries
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut store = Self {
            path: path.as_ref().to_path_buf(),
            entries: BTreeMap::new(),
        };
        store.flush()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored: Vec<StoredEntry> = self
            .entries
            .iter()
            .map(|(k, v)| StoredEntry {
                key: k.clone(),
                value: v.to_vec(),
            })
            .collect();
        let json = serde_json::to_vec(&stored)?;

        let tmp_path = self.path.with_extension("db.tmp");
        let mut file = File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries
            .insert(key.to_vec(), Bytes::copy_from_slice(value));
        self.flush()
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    fn scan(&self) -> Result<Vec<(Bytes, Bytes)>> {
        Ok(self
            .entries
            .iter()
            .map(|(k, v)| (Bytes::copy_from_slice(k), v.clone()))
            .collect())
    }
}

/// Disk manager: resolves store files from the engine config
#[derive(Debug, Clone)]
pub struct DiskManager {
    config: EngineConfig,
}

impl DiskManager {
    pub fn new(config: EngineConfig) -> Result<Self> {
        fs::create_dir_all(config.tables_path())?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl StorageBackend for DiskManager {
    type Store = FileStore;

    fn open_catalog(&self) -> Result<FileStore> {
        FileStore::open(self.config.catalog_path())
    }

    fn create_row_store(&self, table: &str) -> Result<FileStore> {
        FileStore::create(self.config.table_path(table))
    }

    fn open_row_store(&self, table: &str) -> Result<FileStore> {
        FileStore::open(self.config.table_path(table))
    }

    fn drop_row_store(&self, table: &str) -> Result<()> {
        let path = self.config.table_path(table);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_is_durable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movie.db");

        {
            let mut store = FileStore::create(&path).unwrap();
            store.put(b"1", b"1*Matrix").unwrap();
            store.put(b"2", b"2*Heat").unwrap();
            store.delete(b"2").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.scan().unwrap().len(), 1);
        assert_eq!(store.get(b"1").unwrap().as_deref(), Some(&b"1*Matrix"[..]));
        assert!(!store.exists(b"2").unwrap());
    }

    #[test]
    fn test_disk_manager_row_store_lifecycle() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::new(EngineConfig::new().data_dir(dir.path())).unwrap();

        let store = disk.create_row_store("movie").unwrap();
        assert!(store.path().exists());

        disk.drop_row_store("movie").unwrap();
        assert!(!disk.config().table_path("movie").exists());
        // dropping twice is harmless
        disk.drop_row_store("movie").unwrap();
    }
}
