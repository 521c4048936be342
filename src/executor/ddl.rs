//! Schema statements: CREATE TABLE, DROP TABLE, DESC and SHOW TABLES
//!
//! CREATE TABLE validates the whole definition in memory before anything
//! is written, so a rejected statement leaves the catalog untouched.

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::info;

use super::executor::{ExecutionEngine, QueryResult};
use crate::catalog::{Catalog, Column, DataType, ForeignKeyRef, TableSchema};
use crate::error::{Error, Result};
use crate::sql::ast::{CreateTableStatement, TableConstraint};
use crate::storage::{KvStore, StorageBackend, Tuple, Value};

impl<B: StorageBackend> ExecutionEngine<B> {
    pub(crate) fn execute_create_table(
        &self,
        catalog: &mut Catalog<B::Store>,
        stmt: CreateTableStatement,
    ) -> Result<QueryResult> {
        let table_name = stmt.table_name.to_lowercase();
        let mut tables = catalog.list_tables()?;
        if tables.contains(&table_name) {
            return Err(Error::TableExists(table_name));
        }

        let schema = build_schema(&table_name, &stmt)?;
        let targets = validate_references(catalog, &tables, &schema)?;

        for mut target in targets {
            target.referenced_by.push(table_name.clone());
            catalog.put_schema(&target)?;
        }
        catalog.put_schema(&schema)?;
        tables.push(table_name.clone());
        catalog.put_tables(&tables)?;
        self.backend().create_row_store(&table_name)?;

        info!(table = %table_name, columns = schema.column_count(), "table created");
        Ok(QueryResult::with_message(format!(
            "'{}' table is created",
            table_name
        )))
    }

    pub(crate) fn execute_drop_table(
        &self,
        catalog: &mut Catalog<B::Store>,
        name: &str,
    ) -> Result<QueryResult> {
        let table_name = name.to_lowercase();
        let mut tables = catalog.list_tables()?;
        if !tables.contains(&table_name) {
            return Err(Error::NoSuchTable(table_name));
        }

        let schema = catalog.get_schema(&table_name)?;
        if !schema.referenced_by.is_empty() {
            return Err(Error::DropReferencedTable(table_name));
        }

        for target in schema.referenced_tables() {
            let mut target = catalog.get_schema(target)?;
            target.referenced_by.retain(|t| t != &table_name);
            catalog.put_schema(&target)?;
        }

        tables.retain(|t| t != &table_name);
        catalog.put_tables(&tables)?;
        catalog.remove_schema(&table_name)?;
        self.backend().drop_row_store(&table_name)?;

        info!(table = %table_name, "table dropped");
        Ok(QueryResult::with_message(format!(
            "'{}' table is dropped",
            table_name
        )))
    }

    /// One row per column: name, type, nullability and key role
    pub(crate) fn execute_describe(
        &self,
        catalog: &Catalog<B::Store>,
        name: &str,
    ) -> Result<QueryResult> {
        let schema = catalog.get_schema(&name.to_lowercase())?;

        let rows = schema
            .columns
            .values()
            .map(|c| {
                let nullable = if c.nullable { "Y" } else { "N" };
                let key = match (c.primary_key, c.references.is_some()) {
                    (true, true) => "PRI/FOR",
                    (true, false) => "PRI",
                    (false, true) => "FOR",
                    (false, false) => "",
                };
                Tuple::new(vec![
                    Value::Str(c.name.clone()),
                    Value::Str(c.data_type.to_string()),
                    Value::from(nullable),
                    Value::from(key),
                ])
            })
            .collect();

        let columns = ["column_name", "type", "null", "key"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        Ok(QueryResult::with_rows(columns, rows))
    }

    pub(crate) fn execute_show_tables(&self, catalog: &Catalog<B::Store>) -> Result<QueryResult> {
        let rows = catalog
            .list_tables()?
            .into_iter()
            .map(|t| Tuple::new(vec![Value::Str(t)]))
            .collect();
        Ok(QueryResult::with_rows(vec!["table_name".to_string()], rows))
    }
}

/// Columns, primary key and foreign key declarations of a new table
fn build_schema(table_name: &str, stmt: &CreateTableStatement) -> Result<TableSchema> {
    let mut schema = TableSchema::new(table_name);

    for def in &stmt.columns {
        let column = Column::new(&def.name, def.data_type).nullable(!def.not_null);
        if let DataType::Char(0) = column.data_type {
            return Err(Error::InvalidLength(column.name));
        }
        let name = column.name.clone();
        if !schema.add_column(column) {
            return Err(Error::DuplicateColumn(name));
        }
    }

    let mut primary_keys = stmt.constraints.iter().filter_map(|c| match c {
        TableConstraint::PrimaryKey { columns } => Some(columns),
        _ => None,
    });
    if let Some(columns) = primary_keys.next() {
        if primary_keys.next().is_some() {
            return Err(Error::DuplicatePrimaryKey);
        }
        for name in columns {
            let name = name.to_lowercase();
            if schema.primary_key.contains(&name) {
                return Err(Error::DuplicatePrimaryKey);
            }
            let column = schema
                .column_mut(&name)
                .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
            column.primary_key = true;
            column.nullable = false;
            schema.primary_key.push(name);
        }
    }

    for constraint in &stmt.constraints {
        let TableConstraint::ForeignKey {
            columns,
            ref_table,
            ref_columns,
        } = constraint
        else {
            continue;
        };
        if columns.len() != ref_columns.len() {
            return Err(Error::ReferenceType);
        }
        for (name, ref_column) in columns.iter().zip(ref_columns) {
            let name = name.to_lowercase();
            let column = schema
                .column_mut(&name)
                .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
            if column.references.is_some() {
                return Err(Error::DuplicateForeignKey(name));
            }
            column.references = Some(ForeignKeyRef::new(
                ref_table.to_lowercase(),
                ref_column.to_lowercase(),
            ));
        }
    }

    Ok(schema)
}

/// Check every foreign key against the referenced schemas.
///
/// Returns the referenced schemas, ready to record the new table as a
/// referencing one.
fn validate_references<S: KvStore>(
    catalog: &Catalog<S>,
    tables: &[String],
    schema: &TableSchema,
) -> Result<Vec<TableSchema>> {
    // target table -> (schema, referenced columns)
    let mut targets: IndexMap<String, (TableSchema, Vec<String>)> = IndexMap::new();

    for column in schema.columns.values() {
        let Some(target) = &column.references else {
            continue;
        };
        if target.table == schema.name || !tables.contains(&target.table) {
            return Err(Error::ReferenceTableExistence);
        }
        let (target_schema, referenced) = match targets.entry(target.table.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert((catalog.get_schema(&target.table)?, Vec::new())),
        };

        let ref_column = target_schema
            .column(&target.column)
            .ok_or(Error::ReferenceColumnExistence)?;
        if !ref_column.primary_key {
            return Err(Error::ReferenceNonPrimaryKey);
        }
        if ref_column.data_type != column.data_type {
            return Err(Error::ReferenceType);
        }
        referenced.push(target.column.clone());
    }

    // a foreign key must cover the referenced primary key exactly
    for (target_schema, referenced) in targets.values() {
        let covers_key = referenced.len() == target_schema.primary_key.len()
            && target_schema
                .primary_key
                .iter()
                .all(|pk| referenced.contains(pk));
        if !covers_key {
            return Err(Error::ReferenceType);
        }
    }

    Ok(targets.into_values().map(|(schema, _)| schema).collect())
}
