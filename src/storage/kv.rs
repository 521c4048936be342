//! Key-value store abstraction
//!
//! The engine only relies on five primitives: get, put, delete, exists and
//! a full scan. A [`StorageBackend`] hands out one store for the catalog
//! and one per table.

use bytes::Bytes;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::error::Result;

/// A persistent byte-key/byte-value store.
///
/// Every mutation is expected to be durable when the call returns.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove a key. Returns true if it was present.
    fn delete(&mut self, key: &[u8]) -> Result<bool>;

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries in key order
    fn scan(&self) -> Result<Vec<(Bytes, Bytes)>>;
}

/// Opens the catalog store and per-table row stores
pub trait StorageBackend {
    type Store: KvStore;

    fn open_catalog(&self) -> Result<Self::Store>;

    /// Create an empty row store for a new table
    fn create_row_store(&self, table: &str) -> Result<Self::Store>;

    /// Open the row store of an existing table. A missing store is
    /// treated as empty.
    fn open_row_store(&self, table: &str) -> Result<Self::Store>;

    /// Delete a table's row store entirely
    fn drop_row_store(&self, table: &str) -> Result<()>;
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<Vec<u8>, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_vec(), Bytes::copy_from_slice(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }

    fn scan(&self) -> Result<Vec<(Bytes, Bytes)>> {
        Ok(self
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| (Bytes::copy_from_slice(k), v.clone()))
            .collect())
    }
}

/// Backend keeping every store in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryBackend {
    catalog: MemoryStore,
    tables: RefCell<HashMap<String, MemoryStore>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the row stores currently present
    pub fn row_store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl StorageBackend for MemoryBackend {
    type Store = MemoryStore;

    fn open_catalog(&self) -> Result<MemoryStore> {
        Ok(self.catalog.clone())
    }

    fn create_row_store(&self, table: &str) -> Result<MemoryStore> {
        let store = MemoryStore::new();
        self.tables
            .borrow_mut()
            .insert(table.to_string(), store.clone());
        Ok(store)
    }

    fn open_row_store(&self, table: &str) -> Result<MemoryStore> {
        Ok(self
            .tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .clone())
    }

    fn drop_row_store(&self, table: &str) -> Result<()> {
        self.tables.borrow_mut().remove(table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_primitives() {
        let mut store = MemoryStore::new();
        store.put(b"b", b"2").unwrap();
        store.put(b"a", b"1").unwrap();

        assert!(store.exists(b"a").unwrap());
        assert_eq!(store.get(b"b").unwrap().as_deref(), Some(&b"2"[..]));

        let keys: Vec<Bytes> = store.scan().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);

        assert!(store.delete(b"a").unwrap());
        assert!(!store.delete(b"a").unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_backend_shares_stores() {
        let backend = MemoryBackend::new();
        let mut created = backend.create_row_store("movie").unwrap();
        created.put(b"1", b"1*Matrix").unwrap();

        let reopened = backend.open_row_store("movie").unwrap();
        assert_eq!(reopened.len(), 1);

        backend.drop_row_store("movie").unwrap();
        assert!(backend.row_store_names().is_empty());
        assert!(backend.open_row_store("movie").unwrap().is_empty());
    }
}
