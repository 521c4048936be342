//! Engine configuration
//!
//! Resolves where the file backend keeps the catalog and row stores.

use std::path::{Path, PathBuf};

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "DB";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for all store files
    pub data_dir: PathBuf,
    /// Catalog file name, relative to `data_dir`
    pub catalog_file: String,
    /// Row store directory, relative to `data_dir`
    pub tables_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            catalog_file: "catalog.db".to_string(),
            tables_dir: "tables".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the catalog file name
    pub fn catalog_file(mut self, name: impl Into<String>) -> Self {
        self.catalog_file = name.into();
        self
    }

    /// Set the row store directory name
    pub fn tables_dir(mut self, name: impl Into<String>) -> Self {
        self.tables_dir = name.into();
        self
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    pub fn tables_path(&self) -> PathBuf {
        self.data_dir.join(&self.tables_dir)
    }

    /// File holding the rows of `table`
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.tables_path().join(format!("{}.db", table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let config = EngineConfig::new().data_dir("/tmp/kv").tables_dir("rows");
        assert_eq!(config.catalog_path(), PathBuf::from("/tmp/kv/catalog.db"));
        assert_eq!(config.table_path("movie"), PathBuf::from("/tmp/kv/rows/movie.db"));
    }
}
