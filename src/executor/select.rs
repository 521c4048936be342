//! SELECT execution
//!
//! Sources are joined as a full cross product in FROM order, filtered by
//! the WHERE clause and projected onto the select list.

use tracing::debug;

use super::eval::{lookup, source_columns, BoundExpr, Lookup, SourceColumn};
use super::executor::{ExecutionEngine, QueryResult};
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::sql::ast::{ColumnRef, SelectStatement};
use crate::storage::{StorageBackend, Tuple};

/// A projected column: row position plus optional output alias
type Projection = (usize, Option<String>);

impl<B: StorageBackend> ExecutionEngine<B> {
    pub(crate) fn execute_select(
        &self,
        catalog: &Catalog<B::Store>,
        stmt: SelectStatement,
    ) -> Result<QueryResult> {
        let mut sources = Vec::with_capacity(stmt.from.len());
        let mut columns: Vec<SourceColumn> = Vec::new();
        for table_ref in &stmt.from {
            let name = table_ref.name.to_lowercase();
            if !catalog.table_exists(&name)? {
                return Err(Error::NoSuchTable(name));
            }
            let table = self.open_table(catalog, &name)?;
            columns.extend(source_columns(table.schema(), table_ref.alias.as_deref()));
            sources.push(table);
        }

        let projection: Vec<Projection> = if stmt.columns.is_empty() {
            (0..columns.len()).map(|idx| (idx, None)).collect()
        } else {
            stmt.columns
                .iter()
                .map(|select| match lookup(&columns, &select.column) {
                    Lookup::Found(idx) => Ok((idx, select.alias.clone())),
                    _ => Err(Error::SelectColumnResolve(display_name(&select.column))),
                })
                .collect::<Result<_>>()?
        };

        let predicate = stmt
            .where_clause
            .as_ref()
            .map(|expr| BoundExpr::bind(expr, &columns))
            .transpose()?;

        let mut joined: Vec<Tuple> = if sources.is_empty() {
            Vec::new()
        } else {
            vec![Tuple::new(Vec::new())]
        };
        for table in &sources {
            let rows = table.scan()?;
            let mut product = Vec::with_capacity(joined.len() * rows.len());
            for left in &joined {
                for (_, right) in &rows {
                    product.push(left.concat(right));
                }
            }
            joined = product;
        }

        let indices: Vec<usize> = projection.iter().map(|(idx, _)| *idx).collect();
        let rows: Vec<Tuple> = joined
            .into_iter()
            .filter(|row| predicate.as_ref().map_or(true, |p| p.evaluate(row.values())))
            .map(|row| row.project(&indices))
            .collect();

        debug!(sources = sources.len(), rows = rows.len(), "select");
        Ok(QueryResult::with_rows(
            output_names(&columns, &projection),
            rows,
        ))
    }
}

fn display_name(reference: &ColumnRef) -> String {
    match &reference.table {
        Some(table) => format!("{}.{}", table, reference.column),
        None => reference.column.clone(),
    }
}

/// Output header for each projected column.
///
/// Aliases win. A bare column name shared by several projected columns is
/// prefixed with its table's alias or name.
fn output_names(columns: &[SourceColumn], projection: &[Projection]) -> Vec<String> {
    projection
        .iter()
        .map(|(idx, alias)| {
            if let Some(alias) = alias {
                return alias.clone();
            }
            let column = &columns[*idx];
            let shared = projection
                .iter()
                .filter(|(other, _)| columns[*other].column == column.column)
                .count()
                > 1;
            if shared {
                format!("{}.{}", column.qualifier(), column.column)
            } else {
                column.column.clone()
            }
        })
        .collect()
}
