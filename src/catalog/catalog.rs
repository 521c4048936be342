//! System Catalog for kvrel
//!
//! The catalog lives in its own key-value store: one reserved entry holds
//! the ordered list of table names and one entry per table holds its
//! JSON-serialized schema. Nothing is cached; every call reads or writes
//! the store directly.

use super::schema::TableSchema;
use crate::error::{Error, Result};
use crate::storage::KvStore;

/// Reserved key of the table list. Table names are identifiers, so they
/// can never start with a NUL byte.
const TABLES_KEY: &[u8] = b"\0tables";

/// System Catalog - table schemas on top of a key-value store
#[derive(Debug)]
pub struct Catalog<S: KvStore> {
    store: S,
}

impl<S: KvStore> Catalog<S> {
    /// Open a catalog, initializing an empty table list on first use
    pub fn open(mut store: S) -> Result<Self> {
        if !store.exists(TABLES_KEY)? {
            store.put(TABLES_KEY, b"[]")?;
        }
        Ok(Self { store })
    }

    /// List all table names, in creation order
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let bytes = self
            .store
            .get(TABLES_KEY)?
            .ok_or_else(|| Error::Corrupted("catalog table list is missing".to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replace the table list
    pub fn put_tables(&mut self, tables: &[String]) -> Result<()> {
        let json = serde_json::to_vec(tables)?;
        self.store.put(TABLES_KEY, &json)
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_tables()?.iter().any(|t| t == name))
    }

    /// Get a table schema by name
    pub fn get_schema(&self, name: &str) -> Result<TableSchema> {
        let bytes = self
            .store
            .get(name.as_bytes())?
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write a schema under its table name
    pub fn put_schema(&mut self, schema: &TableSchema) -> Result<()> {
        let json = serde_json::to_vec(schema)?;
        self.store.put(schema.name.as_bytes(), &json)
    }

    /// Delete a schema entry
    pub fn remove_schema(&mut self, name: &str) -> Result<()> {
        self.store.delete(name.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};
    use crate::storage::MemoryStore;

    fn movie_schema() -> TableSchema {
        let mut schema = TableSchema::new("movie");
        schema.add_column(Column::new("id", DataType::Int).primary_key(true));
        schema.add_column(Column::new("title", DataType::Char(20)));
        schema.primary_key = vec!["id".to_string()];
        schema
    }

    #[test]
    fn test_open_initializes_empty_list() {
        let catalog = Catalog::open(MemoryStore::new()).unwrap();
        assert!(catalog.list_tables().unwrap().is_empty());
    }

    #[test]
    fn test_put_and_get_schema() {
        let mut catalog = Catalog::open(MemoryStore::new()).unwrap();

        catalog.put_schema(&movie_schema()).unwrap();
        catalog.put_tables(&["movie".to_string()]).unwrap();

        assert!(catalog.table_exists("movie").unwrap());
        assert_eq!(catalog.get_schema("movie").unwrap(), movie_schema());
    }

    #[test]
    fn test_get_missing_schema() {
        let catalog = Catalog::open(MemoryStore::new()).unwrap();
        let result = catalog.get_schema("movie");
        assert!(matches!(result, Err(Error::NoSuchTable(_))));
    }

    #[test]
    fn test_remove_schema() {
        let store = MemoryStore::new();
        let mut catalog = Catalog::open(store.clone()).unwrap();
        catalog.put_schema(&movie_schema()).unwrap();

        catalog.remove_schema("movie").unwrap();
        assert!(catalog.get_schema("movie").is_err());
        // only the table list entry remains
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_table_named_tables_does_not_clash() {
        let mut catalog = Catalog::open(MemoryStore::new()).unwrap();
        let schema = TableSchema::new("tables");
        catalog.put_schema(&schema).unwrap();
        catalog.put_tables(&["tables".to_string()]).unwrap();

        assert_eq!(catalog.list_tables().unwrap(), vec!["tables".to_string()]);
        assert_eq!(catalog.get_schema("tables").unwrap().name, "tables");
    }
}
