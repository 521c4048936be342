//! Statement Executor for kvrel
//!
//! This module dispatches statement trees to the DDL and DML handlers and
//! shapes their output into a [`QueryResult`].

use tracing::debug;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::sql::ast::Statement;
use crate::storage::{DiskManager, MemoryBackend, StorageBackend, Table, Tuple};

/// Query result
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Tuple>,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub affected_rows: usize,
    /// Rows matched but left alone to keep references intact
    pub skipped_rows: usize,
    /// Message
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            skipped_rows: 0,
            message: None,
        }
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result set
    pub fn with_rows(columns: Vec<String>, rows: Vec<Tuple>) -> Self {
        Self {
            columns,
            rows,
            ..Self::empty()
        }
    }

    /// Render as text: the message, or a bordered table for result sets
    pub fn render(&self) -> String {
        if self.columns.is_empty() {
            return self.message.clone().unwrap_or_default();
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (i, value) in row.values().iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(value.to_string().chars().count());
                }
            }
        }

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w + 2))
            .collect::<Vec<_>>()
            .join("+");
        let separator = format!("+{}+\n", separator);

        let format_line = |cells: Vec<String>| -> String {
            let line: String = cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!(" {:<width$} ", cell, width = *w))
                .collect::<Vec<_>>()
                .join("|");
            format!("|{}|\n", line)
        };

        let mut output = String::new();
        output.push_str(&separator);
        output.push_str(&format_line(self.columns.clone()));
        output.push_str(&separator);
        for row in &self.rows {
            output.push_str(&format_line(
                row.values().iter().map(|v| v.to_string()).collect(),
            ));
        }
        if !self.rows.is_empty() {
            output.push_str(&separator);
        }
        output
    }
}

/// Execution Engine
///
/// Holds only the storage backend. The catalog is reopened for every
/// statement and table stores are opened on demand, so nothing is cached
/// between statements.
#[derive(Debug)]
pub struct ExecutionEngine<B: StorageBackend = DiskManager> {
    backend: B,
}

impl ExecutionEngine<DiskManager> {
    /// Open (or create) a file-backed database
    pub fn open(config: EngineConfig) -> Result<Self> {
        debug!(data_dir = %config.data_dir.display(), "opening database");
        Ok(Self::new(DiskManager::new(config)?))
    }
}

impl ExecutionEngine<MemoryBackend> {
    /// Create a database that lives in memory
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: StorageBackend> ExecutionEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open the system catalog
    pub fn catalog(&self) -> Result<Catalog<B::Store>> {
        Catalog::open(self.backend.open_catalog()?)
    }

    /// Execute a statement
    pub fn execute(&mut self, statement: Statement) -> Result<QueryResult> {
        let mut catalog = self.catalog()?;

        match statement {
            Statement::CreateTable(stmt) => self.execute_create_table(&mut catalog, stmt),
            Statement::DropTable(name) => self.execute_drop_table(&mut catalog, &name),
            Statement::Describe(name) => self.execute_describe(&catalog, &name),
            Statement::ShowTables => self.execute_show_tables(&catalog),
            Statement::Insert(stmt) => self.execute_insert(&catalog, stmt),
            Statement::Delete(stmt) => self.execute_delete(&catalog, stmt),
            Statement::Update(stmt) => self.execute_update(&catalog, stmt),
            Statement::Select(stmt) => self.execute_select(&catalog, stmt),
        }
    }

    /// Load a table's schema and open its row store
    pub(crate) fn open_table(
        &self,
        catalog: &Catalog<B::Store>,
        name: &str,
    ) -> Result<Table<B::Store>> {
        let schema = catalog.get_schema(name)?;
        let store = self.backend.open_row_store(&schema.name)?;
        Ok(Table::new(schema, store))
    }
}
