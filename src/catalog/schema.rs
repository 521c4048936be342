//! Schema definitions for kvrel
//!
//! This module defines table schemas, column metadata and the foreign-key
//! graph stored with each schema.

use super::types::DataType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target of a foreign key: `table.column`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

impl ForeignKeyRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ForeignKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name (lowercased)
    pub name: String,
    /// Declared type
    pub data_type: DataType,
    /// Is this column nullable?
    pub nullable: bool,
    /// Is this part of the primary key?
    pub primary_key: bool,
    /// Foreign key target, if any
    pub references: Option<ForeignKeyRef>,
}

impl Column {
    /// Create a new nullable column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into().to_lowercase(),
            data_type,
            nullable: true,
            primary_key: false,
            references: None,
        }
    }

    /// Set nullable flag
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set primary key flag. Primary key columns are never nullable.
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        if pk {
            self.nullable = false;
        }
        self
    }

    /// Set the foreign key target
    pub fn references(mut self, target: ForeignKeyRef) -> Self {
        self.references = Some(target);
        self
    }
}

/// Table schema - columns in declared order plus key metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name (lowercased)
    pub name: String,
    /// Columns keyed by name, in declared order
    pub columns: IndexMap<String, Column>,
    /// Primary key column names, in constraint order
    pub primary_key: Vec<String>,
    /// Tables declaring a foreign key into this one
    pub referenced_by: Vec<String>,
}

impl TableSchema {
    /// Create a new empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            columns: IndexMap::new(),
            primary_key: Vec::new(),
            referenced_by: Vec::new(),
        }
    }

    /// Append a column. Returns false if the name is already taken.
    pub fn add_column(&mut self, column: Column) -> bool {
        if self.columns.contains_key(&column.name) {
            return false;
        }
        self.columns.insert(column.name.clone(), column);
        true
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(name)
    }

    /// Position of a column in row encoding order
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Column types in row order
    pub fn data_types(&self) -> Vec<DataType> {
        self.columns.values().map(|c| c.data_type).collect()
    }

    /// Row positions of the primary key columns, in schema order.
    ///
    /// Keys are encoded in schema order regardless of the order the
    /// PRIMARY KEY constraint listed them in.
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.columns
            .values()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect()
    }

    /// Primary key column names in schema order
    pub fn primary_key_in_schema_order(&self) -> Vec<&str> {
        self.columns
            .values()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Distinct tables this schema references, in column order
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for column in self.columns.values() {
            if let Some(target) = &column.references {
                if !tables.contains(&target.table.as_str()) {
                    tables.push(&target.table);
                }
            }
        }
        tables
    }

    /// Foreign key columns grouped by target table.
    ///
    /// Each entry maps a target table to `(row position, referenced column)`
    /// pairs for every local column pointing into it.
    pub fn foreign_key_groups(&self) -> IndexMap<String, Vec<(usize, String)>> {
        let mut groups: IndexMap<String, Vec<(usize, String)>> = IndexMap::new();
        for (idx, column) in self.columns.values().enumerate() {
            if let Some(target) = &column.references {
                groups
                    .entry(target.table.clone())
                    .or_default()
                    .push((idx, target.column.clone()));
            }
        }
        groups
    }

    /// Local columns referencing `table`, as `(row position, referenced column)`
    pub fn foreign_keys_into(&self, table: &str) -> Vec<(usize, String)> {
        self.foreign_key_groups()
            .shift_remove(table)
            .unwrap_or_default()
    }

    /// True if some non-nullable column references `table`
    pub fn has_non_nullable_fk_into(&self, table: &str) -> bool {
        self.columns.values().any(|c| {
            !c.nullable
                && c.references
                    .as_ref()
                    .map_or(false, |target| target.table == table)
        })
    }
}
