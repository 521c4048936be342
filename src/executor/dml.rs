//! Row statements: INSERT, DELETE and UPDATE
//!
//! Foreign keys are enforced against the rows actually present. While some
//! other table declares a non-nullable foreign key into a table, none of
//! its rows may be deleted and none of its key columns may be updated.
//! Nullable references to a row that goes away are set to NULL instead.

use bytes::Bytes;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::coerce::literal_to_value;
use super::eval::{source_columns, BoundExpr};
use super::executor::{ExecutionEngine, QueryResult};
use crate::catalog::{Catalog, TableSchema};
use crate::error::{Error, Result};
use crate::sql::ast::{BoolExpr, DeleteStatement, InsertStatement, UpdateStatement};
use crate::storage::tuple::encode_key;
use crate::storage::{KvStore, StorageBackend, Table, Tuple, Value};

/// A row update that passed every check and waits to be written
struct PlannedUpdate {
    old_key: Bytes,
    new_key: Bytes,
    row: Tuple,
}

impl PlannedUpdate {
    fn moves(&self) -> bool {
        self.old_key != self.new_key
    }
}

impl<B: StorageBackend> ExecutionEngine<B> {
    pub(crate) fn execute_insert(
        &self,
        catalog: &Catalog<B::Store>,
        stmt: InsertStatement,
    ) -> Result<QueryResult> {
        let mut table = self.open_table(catalog, &stmt.table_name.to_lowercase())?;
        let schema = table.schema().clone();

        let positions = insert_positions(&schema, stmt.columns.as_deref())?;
        if stmt.values.len() != positions.len() {
            return Err(Error::TypeMismatch);
        }

        let mut values = vec![Value::Null; schema.column_count()];
        for (literal, &idx) in stmt.values.iter().zip(&positions) {
            let (_, column) = schema
                .columns
                .get_index(idx)
                .ok_or_else(|| Error::Corrupted(format!("column {} out of range", idx)))?;
            values[idx] = literal_to_value(literal, column)?;
        }
        let row = Tuple::new(values);

        if let Some(key) = table.key_of(&row) {
            if table.contains_key(&key)? {
                return Err(Error::PrimaryKeyDuplicate);
            }
        }
        self.check_references(catalog, &schema, std::slice::from_ref(&row))?;

        let key = table.insert(&row)?;
        debug!(table = %schema.name, key = ?key, "row inserted");
        Ok(QueryResult::with_affected_rows(1, "The row is inserted"))
    }

    pub(crate) fn execute_delete(
        &self,
        catalog: &Catalog<B::Store>,
        stmt: DeleteStatement,
    ) -> Result<QueryResult> {
        let mut table = self.open_table(catalog, &stmt.table_name.to_lowercase())?;
        let schema = table.schema().clone();
        let selected = select_rows(&table, stmt.where_clause.as_ref())?;
        let mut referencing = self.referencing_tables(catalog, &schema)?;

        let mut deleted = 0;
        let mut protected = 0;
        if is_protected(&referencing, &schema) {
            protected = selected.len();
        } else {
            for (key, _) in selected {
                table.delete(&key)?;
                null_out_references(&mut referencing, &schema, &key)?;
                deleted += 1;
            }
        }

        if protected > 0 {
            warn!(table = %schema.name, protected, "rows kept, still referenced");
        }
        debug!(table = %schema.name, deleted, "rows deleted");
        Ok(QueryResult::with_affected_rows(
            deleted,
            format!("{} row(s) are deleted", deleted),
        ))
    }

    pub(crate) fn execute_update(
        &self,
        catalog: &Catalog<B::Store>,
        stmt: UpdateStatement,
    ) -> Result<QueryResult> {
        let mut table = self.open_table(catalog, &stmt.table_name.to_lowercase())?;
        let schema = table.schema().clone();

        let column_name = stmt.column.to_lowercase();
        let col_idx = schema
            .column_index(&column_name)
            .ok_or_else(|| Error::NoSuchColumn(column_name.clone()))?;
        let column = &schema.columns[col_idx];
        let new_value = literal_to_value(&stmt.value, column)?;

        let selected = select_rows(&table, stmt.where_clause.as_ref())?;
        let mut referencing = if column.primary_key {
            self.referencing_tables(catalog, &schema)?
        } else {
            Vec::new()
        };

        let mut planned = Vec::new();
        let mut not_updated = 0;
        if is_protected(&referencing, &schema) {
            not_updated = selected.len();
        } else {
            for (old_key, mut row) in selected {
                row.set(col_idx, new_value.clone());
                let new_key = table.key_of(&row).unwrap_or_else(|| old_key.clone());
                planned.push(PlannedUpdate {
                    old_key,
                    new_key,
                    row,
                });
            }
        }

        if column.references.is_some() {
            let rows: Vec<Tuple> = planned.iter().map(|p| p.row.clone()).collect();
            self.check_references(catalog, &schema, &rows)?;
        }
        if column.primary_key {
            check_unique_keys(&table, &planned)?;
        }

        for update in planned.iter().filter(|p| p.moves()) {
            table.delete(&update.old_key)?;
        }
        for update in &planned {
            table.put(&update.new_key, &update.row)?;
        }
        for update in planned.iter().filter(|p| p.moves()) {
            null_out_references(&mut referencing, &schema, &update.old_key)?;
        }

        let updated = planned.len();
        if not_updated > 0 {
            warn!(table = %schema.name, not_updated, "rows kept, still referenced");
        }
        debug!(table = %schema.name, updated, "rows updated");

        let mut message = format!("{} row(s) are updated", updated);
        if not_updated > 0 {
            message.push_str(&format!(
                "\n{} row(s) are not updated due to referential integrity",
                not_updated
            ));
        }
        let mut result = QueryResult::with_affected_rows(updated, message);
        result.skipped_rows = not_updated;
        Ok(result)
    }

    /// Every non-null foreign key of `rows` must point at an existing row
    fn check_references(
        &self,
        catalog: &Catalog<B::Store>,
        schema: &TableSchema,
        rows: &[Tuple],
    ) -> Result<()> {
        for (target_name, pairs) in schema.foreign_key_groups() {
            let target = self.open_table(catalog, &target_name)?;
            for row in rows {
                let Some(key) = referenced_key(target.schema(), &pairs, row)? else {
                    continue;
                };
                if !target.contains_key(&key)? {
                    return Err(Error::ReferentialIntegrityViolation);
                }
            }
        }
        Ok(())
    }

    /// Open every table declaring a foreign key into `schema`
    fn referencing_tables(
        &self,
        catalog: &Catalog<B::Store>,
        schema: &TableSchema,
    ) -> Result<Vec<Table<B::Store>>> {
        schema
            .referenced_by
            .iter()
            .map(|name| self.open_table(catalog, name))
            .collect()
    }
}

/// Row positions the INSERT values land in
fn insert_positions(schema: &TableSchema, columns: Option<&[String]>) -> Result<Vec<usize>> {
    let Some(columns) = columns else {
        return Ok((0..schema.column_count()).collect());
    };
    if columns.len() != schema.column_count() {
        return Err(Error::TypeMismatch);
    }

    let mut positions = Vec::with_capacity(columns.len());
    for name in columns {
        let name = name.to_lowercase();
        let idx = schema
            .column_index(&name)
            .ok_or_else(|| Error::NoSuchColumn(name.clone()))?;
        if positions.contains(&idx) {
            return Err(Error::TypeMismatch);
        }
        positions.push(idx);
    }
    Ok(positions)
}

/// Rows of `table` satisfying the WHERE clause, with their keys
fn select_rows<S: KvStore>(
    table: &Table<S>,
    where_clause: Option<&BoolExpr>,
) -> Result<Vec<(Bytes, Tuple)>> {
    let columns = source_columns(table.schema(), None);
    let predicate = where_clause
        .map(|expr| BoundExpr::bind(expr, &columns))
        .transpose()?;

    let rows = table.scan()?;
    Ok(match predicate {
        Some(predicate) => rows
            .into_iter()
            .filter(|(_, row)| predicate.evaluate(row.values()))
            .collect(),
        None => rows,
    })
}

/// Key of the `target` row that `row` references through `pairs`.
///
/// `None` when any of the referencing values is NULL.
fn referenced_key(
    target: &TableSchema,
    pairs: &[(usize, String)],
    row: &Tuple,
) -> Result<Option<Bytes>> {
    let mut values = Vec::with_capacity(pairs.len());
    for pk in target.primary_key_in_schema_order() {
        let (idx, _) = pairs
            .iter()
            .find(|(_, referenced)| referenced == pk)
            .ok_or_else(|| {
                Error::Corrupted(format!("no foreign key column for {}.{}", target.name, pk))
            })?;
        match row.get(*idx) {
            Some(Value::Null) | None => return Ok(None),
            Some(value) => values.push(value.clone()),
        }
    }
    Ok(Some(encode_key(&values)))
}

/// Rows of `referencing` pointing at the `target` row stored under `key`
fn rows_referencing<S: KvStore>(
    referencing: &Table<S>,
    target: &TableSchema,
    key: &[u8],
) -> Result<Vec<(Bytes, Tuple)>> {
    let pairs = referencing.schema().foreign_keys_into(&target.name);
    let mut found = Vec::new();
    for (row_key, row) in referencing.scan()? {
        if referenced_key(target, &pairs, &row)?.as_deref() == Some(key) {
            found.push((row_key, row));
        }
    }
    Ok(found)
}

/// True if some referencing table declares a non-nullable foreign key
/// into `target`, whether or not any of its rows use it
fn is_protected<S: KvStore>(referencing: &[Table<S>], target: &TableSchema) -> bool {
    referencing
        .iter()
        .any(|table| table.schema().has_non_nullable_fk_into(&target.name))
}

/// Set every nullable reference to the vanished row to NULL
fn null_out_references<S: KvStore>(
    referencing: &mut [Table<S>],
    target: &TableSchema,
    key: &[u8],
) -> Result<()> {
    for table in referencing.iter_mut() {
        let pairs = table.schema().foreign_keys_into(&target.name);
        for (row_key, mut row) in rows_referencing(table, target, key)? {
            for (idx, _) in &pairs {
                row.set(*idx, Value::Null);
            }
            table.put(&row_key, &row)?;
            debug!(table = %table.name(), "reference set to null");
        }
    }
    Ok(())
}

/// Keys after the update must stay unique across the whole table
fn check_unique_keys<S: KvStore>(table: &Table<S>, planned: &[PlannedUpdate]) -> Result<()> {
    let vacated: HashSet<&Bytes> = planned
        .iter()
        .filter(|p| p.moves())
        .map(|p| &p.old_key)
        .collect();

    let mut taken: HashSet<Bytes> = table
        .scan()?
        .into_iter()
        .map(|(key, _)| key)
        .filter(|key| !vacated.contains(key))
        .collect();

    for update in planned.iter().filter(|p| p.moves()) {
        if !taken.insert(update.new_key.clone()) {
            return Err(Error::PrimaryKeyDuplicate);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::sql::ast::{
        ColumnDef, ColumnRef, CompOp, CreateTableStatement, Literal, Operand, Statement,
        TableConstraint,
    };
    use crate::storage::MemoryBackend;

    fn setup() -> ExecutionEngine<MemoryBackend> {
        let mut engine = ExecutionEngine::in_memory();
        engine
            .execute(Statement::CreateTable(CreateTableStatement {
                table_name: "movie".to_string(),
                columns: vec![
                    ColumnDef::new("id", DataType::Int),
                    ColumnDef::new("title", DataType::Char(10)),
                ],
                constraints: vec![TableConstraint::PrimaryKey {
                    columns: vec!["id".to_string()],
                }],
            }))
            .unwrap();
        engine
            .execute(Statement::CreateTable(CreateTableStatement {
                table_name: "review".to_string(),
                columns: vec![
                    ColumnDef::new("rid", DataType::Int),
                    ColumnDef::new("movie_id", DataType::Int),
                ],
                constraints: vec![
                    TableConstraint::PrimaryKey {
                        columns: vec!["rid".to_string()],
                    },
                    TableConstraint::ForeignKey {
                        columns: vec!["movie_id".to_string()],
                        ref_table: "movie".to_string(),
                        ref_columns: vec!["id".to_string()],
                    },
                ],
            }))
            .unwrap();
        engine
    }

    fn insert(
        engine: &mut ExecutionEngine<MemoryBackend>,
        table: &str,
        values: Vec<Literal>,
    ) -> Result<QueryResult> {
        engine.execute(Statement::Insert(InsertStatement {
            table_name: table.to_string(),
            columns: None,
            values,
        }))
    }

    fn id_is(n: i64) -> BoolExpr {
        BoolExpr::compare(
            Operand::Column(ColumnRef::new("id")),
            CompOp::Eq,
            Operand::Literal(Literal::int(n)),
        )
    }

    fn rows(engine: &ExecutionEngine<MemoryBackend>, table: &str) -> Vec<Tuple> {
        let catalog = engine.catalog().unwrap();
        let table = engine.open_table(&catalog, table).unwrap();
        table.scan().unwrap().into_iter().map(|(_, row)| row).collect()
    }

    #[test]
    fn test_insert_checks() {
        let mut engine = setup();
        let result =
            insert(&mut engine, "movie", vec![Literal::int(1), Literal::string("Heat")]).unwrap();
        assert_eq!(result.message.as_deref(), Some("The row is inserted"));

        let err = insert(&mut engine, "movie", vec![Literal::int(1), Literal::string("Alien")])
            .unwrap_err();
        assert!(matches!(err, Error::PrimaryKeyDuplicate));

        let err = insert(&mut engine, "movie", vec![Literal::int(2)]).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch));

        let err =
            insert(&mut engine, "review", vec![Literal::int(1), Literal::int(9)]).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrityViolation));

        insert(&mut engine, "review", vec![Literal::int(1), Literal::Null]).unwrap();
        insert(&mut engine, "review", vec![Literal::int(2), Literal::int(1)]).unwrap();

        let err = insert(&mut engine, "actor", vec![Literal::int(1)]).unwrap_err();
        assert!(matches!(err, Error::NoSuchTable(_)));
    }

    #[test]
    fn test_insert_with_column_list() {
        let mut engine = setup();
        engine
            .execute(Statement::Insert(InsertStatement {
                table_name: "movie".to_string(),
                columns: Some(vec!["TITLE".to_string(), "id".to_string()]),
                values: vec![Literal::string("Heat"), Literal::int(7)],
            }))
            .unwrap();
        assert_eq!(
            rows(&engine, "movie"),
            vec![Tuple::new(vec![Value::Int(7), Value::from("Heat")])]
        );

        let err = engine
            .execute(Statement::Insert(InsertStatement {
                table_name: "movie".to_string(),
                columns: Some(vec!["rating".to_string(), "id".to_string()]),
                values: vec![Literal::int(1), Literal::int(8)],
            }))
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchColumn(name) if name == "rating"));
    }

    #[test]
    fn test_delete_nulls_nullable_references() {
        let mut engine = setup();
        insert(&mut engine, "movie", vec![Literal::int(1), Literal::string("Heat")]).unwrap();
        insert(&mut engine, "review", vec![Literal::int(10), Literal::int(1)]).unwrap();

        let result = engine
            .execute(Statement::Delete(DeleteStatement {
                table_name: "movie".to_string(),
                where_clause: Some(id_is(1)),
            }))
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.message.as_deref(), Some("1 row(s) are deleted"));
        assert_eq!(
            rows(&engine, "review"),
            vec![Tuple::new(vec![Value::Int(10), Value::Null])]
        );
    }

    #[test]
    fn test_update_key_moves_row() {
        let mut engine = setup();
        insert(&mut engine, "movie", vec![Literal::int(1), Literal::string("Heat")]).unwrap();
        insert(&mut engine, "movie", vec![Literal::int(2), Literal::string("Alien")]).unwrap();
        insert(&mut engine, "review", vec![Literal::int(10), Literal::int(1)]).unwrap();

        let update = |n: i64, filter: i64| {
            Statement::Update(UpdateStatement {
                table_name: "movie".to_string(),
                column: "id".to_string(),
                value: Literal::int(n),
                where_clause: Some(id_is(filter)),
            })
        };

        let err = engine.execute(update(2, 1)).unwrap_err();
        assert!(matches!(err, Error::PrimaryKeyDuplicate));

        let result = engine.execute(update(5, 1)).unwrap();
        assert_eq!(result.affected_rows, 1);

        let catalog = engine.catalog().unwrap();
        let movie = engine.open_table(&catalog, "movie").unwrap();
        assert!(!movie.contains_key(b"1").unwrap());
        assert!(movie.contains_key(b"5").unwrap());
        // the nullable reference to the old key is cleared
        assert_eq!(
            rows(&engine, "review"),
            vec![Tuple::new(vec![Value::Int(10), Value::Null])]
        );
    }

    #[test]
    fn test_update_foreign_key_column_is_checked() {
        let mut engine = setup();
        insert(&mut engine, "movie", vec![Literal::int(1), Literal::string("Heat")]).unwrap();
        insert(&mut engine, "review", vec![Literal::int(10), Literal::Null]).unwrap();

        let set_movie = |n: i64| {
            Statement::Update(UpdateStatement {
                table_name: "review".to_string(),
                column: "movie_id".to_string(),
                value: Literal::int(n),
                where_clause: None,
            })
        };

        let err = engine.execute(set_movie(3)).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrityViolation));
        engine.execute(set_movie(1)).unwrap();
        assert_eq!(
            rows(&engine, "review"),
            vec![Tuple::new(vec![Value::Int(10), Value::Int(1)])]
        );
    }

    #[test]
    fn test_update_unknown_column() {
        let mut engine = setup();
        let err = engine
            .execute(Statement::Update(UpdateStatement {
                table_name: "movie".to_string(),
                column: "rating".to_string(),
                value: Literal::int(1),
                where_clause: None,
            }))
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchColumn(_)));
    }

    /// seat(hall, num) keyed on both columns, and ticket(tid, n, h) whose
    /// (n, h) references seat(num, hall)
    fn setup_seats(ticket_fk_not_null: bool) -> ExecutionEngine<MemoryBackend> {
        let mut engine = ExecutionEngine::in_memory();
        engine
            .execute(Statement::CreateTable(CreateTableStatement {
                table_name: "seat".to_string(),
                columns: vec![
                    ColumnDef::new("hall", DataType::Int),
                    ColumnDef::new("num", DataType::Int),
                ],
                constraints: vec![TableConstraint::PrimaryKey {
                    columns: vec!["hall".to_string(), "num".to_string()],
                }],
            }))
            .unwrap();

        let (mut n, mut h) = (
            ColumnDef::new("n", DataType::Int),
            ColumnDef::new("h", DataType::Int),
        );
        if ticket_fk_not_null {
            n = n.not_null();
            h = h.not_null();
        }
        engine
            .execute(Statement::CreateTable(CreateTableStatement {
                table_name: "ticket".to_string(),
                columns: vec![ColumnDef::new("tid", DataType::Int), n, h],
                constraints: vec![
                    TableConstraint::PrimaryKey {
                        columns: vec!["tid".to_string()],
                    },
                    TableConstraint::ForeignKey {
                        columns: vec!["n".to_string(), "h".to_string()],
                        ref_table: "seat".to_string(),
                        ref_columns: vec!["num".to_string(), "hall".to_string()],
                    },
                ],
            }))
            .unwrap();
        engine
    }

    fn seat_in_hall(hall: i64) -> BoolExpr {
        BoolExpr::compare(
            Operand::Column(ColumnRef::new("hall")),
            CompOp::Eq,
            Operand::Literal(Literal::int(hall)),
        )
    }

    #[test]
    fn test_composite_reference_insert_and_null_out() {
        let mut engine = setup_seats(false);
        insert(&mut engine, "seat", vec![Literal::int(1), Literal::int(5)]).unwrap();

        // n = 5, h = 1 names seat (hall 1, num 5)
        insert(&mut engine, "ticket", vec![Literal::int(9), Literal::int(5), Literal::int(1)])
            .unwrap();
        let err = insert(
            &mut engine,
            "ticket",
            vec![Literal::int(10), Literal::int(1), Literal::int(5)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrityViolation));

        // a partly null reference is not checked
        insert(&mut engine, "ticket", vec![Literal::int(11), Literal::Null, Literal::int(5)])
            .unwrap();

        let result = engine
            .execute(Statement::Delete(DeleteStatement {
                table_name: "seat".to_string(),
                where_clause: Some(seat_in_hall(1)),
            }))
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert!(rows(&engine, "seat").is_empty());
        assert_eq!(
            rows(&engine, "ticket"),
            vec![
                Tuple::new(vec![Value::Int(11), Value::Null, Value::Int(5)]),
                Tuple::new(vec![Value::Int(9), Value::Null, Value::Null]),
            ]
        );
    }

    #[test]
    fn test_composite_reference_protects_table() {
        let mut engine = setup_seats(true);
        insert(&mut engine, "seat", vec![Literal::int(1), Literal::int(5)]).unwrap();
        insert(&mut engine, "seat", vec![Literal::int(2), Literal::int(5)]).unwrap();
        insert(&mut engine, "ticket", vec![Literal::int(9), Literal::int(5), Literal::int(1)])
            .unwrap();

        // hall 2 is not referenced but the table is still protected
        let result = engine
            .execute(Statement::Delete(DeleteStatement {
                table_name: "seat".to_string(),
                where_clause: Some(seat_in_hall(2)),
            }))
            .unwrap();
        assert_eq!(result.affected_rows, 0);
        assert_eq!(rows(&engine, "seat").len(), 2);
    }

    #[test]
    fn test_non_nullable_reference_protects_every_row() {
        let mut engine = setup();
        engine
            .execute(Statement::CreateTable(CreateTableStatement {
                table_name: "booking".to_string(),
                columns: vec![ColumnDef::new("movie_id", DataType::Int).not_null()],
                constraints: vec![TableConstraint::ForeignKey {
                    columns: vec!["movie_id".to_string()],
                    ref_table: "movie".to_string(),
                    ref_columns: vec!["id".to_string()],
                }],
            }))
            .unwrap();
        insert(&mut engine, "movie", vec![Literal::int(1), Literal::string("Heat")]).unwrap();
        insert(&mut engine, "movie", vec![Literal::int(2), Literal::string("Alien")]).unwrap();
        insert(&mut engine, "booking", vec![Literal::int(1)]).unwrap();

        let result = engine
            .execute(Statement::Delete(DeleteStatement {
                table_name: "movie".to_string(),
                where_clause: Some(id_is(2)),
            }))
            .unwrap();
        assert_eq!(result.affected_rows, 0);
        assert_eq!(result.message.as_deref(), Some("0 row(s) are deleted"));

        // the key stays the same, the row is skipped anyway
        let result = engine
            .execute(Statement::Update(UpdateStatement {
                table_name: "movie".to_string(),
                column: "id".to_string(),
                value: Literal::int(1),
                where_clause: Some(id_is(1)),
            }))
            .unwrap();
        assert_eq!(result.affected_rows, 0);
        assert_eq!(result.skipped_rows, 1);
        assert_eq!(
            result.message.as_deref(),
            Some("0 row(s) are updated\n1 row(s) are not updated due to referential integrity")
        );

        // other columns are still free to change
        let result = engine
            .execute(Statement::Update(UpdateStatement {
                table_name: "movie".to_string(),
                column: "title".to_string(),
                value: Literal::string("Ronin"),
                where_clause: Some(id_is(2)),
            }))
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(
            rows(&engine, "movie"),
            vec![
                Tuple::new(vec![Value::Int(1), Value::from("Heat")]),
                Tuple::new(vec![Value::Int(2), Value::from("Ronin")]),
            ]
        );
    }
}
