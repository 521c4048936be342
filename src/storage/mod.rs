//! Storage engine module
//!
//! This module contains the storage engine components:
//! - Key-value store abstraction and backends
//! - File-backed stores
//! - Value codec (tuples, keys)
//! - Keyed table access

pub mod disk;
pub mod kv;
pub mod table;
pub mod tuple;

pub use disk::{DiskManager, FileStore};
pub use kv::{KvStore, MemoryBackend, MemoryStore, StorageBackend};
pub use table::Table;
pub use tuple::{Tuple, Value};
