//! Table storage for kvrel
//!
//! This module combines a schema and its row store to provide keyed row
//! operations.

use bytes::Bytes;

use super::kv::KvStore;
use super::tuple::Tuple;
use crate::catalog::{DataType, TableSchema};
use crate::error::Result;

/// A table combining schema and storage
#[derive(Debug)]
pub struct Table<S: KvStore> {
    schema: TableSchema,
    types: Vec<DataType>,
    key_indices: Vec<usize>,
    store: S,
}

impl<S: KvStore> Table<S> {
    pub fn new(schema: TableSchema, store: S) -> Self {
        let types = schema.data_types();
        let key_indices = schema.primary_key_indices();
        Self {
            schema,
            types,
            key_indices,
            store,
        }
    }

    /// Get table name
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Row key of a tuple. Tables without a primary key have no natural
    /// key; see [`Table::next_surrogate_key`].
    pub fn key_of(&self, tuple: &Tuple) -> Option<Bytes> {
        if self.key_indices.is_empty() {
            None
        } else {
            Some(tuple.key(&self.key_indices))
        }
    }

    /// Next free surrogate key for a table without a primary key.
    ///
    /// Keys are zero padded so byte order matches insertion order.
    pub fn next_surrogate_key(&self) -> Result<Bytes> {
        let max = self
            .store
            .scan()?
            .iter()
            .filter_map(|(k, _)| std::str::from_utf8(k).ok()?.parse::<u64>().ok())
            .max();
        let next = max.map_or(0, |m| m + 1);
        Ok(Bytes::from(format!("{:020}", next)))
    }

    pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
        self.store.exists(key)
    }

    /// Write a row under `key`, replacing any previous row
    pub fn put(&mut self, key: &[u8], tuple: &Tuple) -> Result<()> {
        self.store.put(key, &tuple.encode())
    }

    /// Insert a row under its natural or surrogate key
    pub fn insert(&mut self, tuple: &Tuple) -> Result<Bytes> {
        let key = match self.key_of(tuple) {
            Some(key) => key,
            None => self.next_surrogate_key()?,
        };
        self.put(&key, tuple)?;
        Ok(key)
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        self.store.delete(key)
    }

    /// All rows with their keys
    pub fn scan(&self) -> Result<Vec<(Bytes, Tuple)>> {
        self.store
            .scan()?
            .into_iter()
            .map(|(key, bytes)| Ok((key, Tuple::decode(&bytes, &self.types)?)))
            .collect()
    }
}
