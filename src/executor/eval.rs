//! WHERE clause evaluation for kvrel
//!
//! A WHERE tree is bound once against the columns of its row sources,
//! which resolves every column reference to a row position and checks
//! operand kinds. The bound predicate is then evaluated per row.
//!
//! Evaluation is two-valued: any comparison involving NULL is false.

use std::cmp::Ordering;

use super::coerce::operand_value;
use crate::catalog::{DataType, TableSchema, ValueKind};
use crate::error::{Error, Result};
use crate::sql::ast::{BoolExpr, BoolFactor, BoolTest, ColumnRef, CompOp, Operand, Predicate};
use crate::storage::Value;

/// Provenance of one position in a (possibly joined) row
#[derive(Debug, Clone, PartialEq)]
pub struct SourceColumn {
    /// Table the column belongs to
    pub table: String,
    /// Alias the table was introduced with
    pub alias: Option<String>,
    pub column: String,
    pub data_type: DataType,
}

impl SourceColumn {
    /// True if `qualifier` names this column's table, by name or alias
    pub fn matches_qualifier(&self, qualifier: &str) -> bool {
        self.table == qualifier || self.alias.as_deref() == Some(qualifier)
    }

    /// Name used to disambiguate the column in output headers
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// Row layout of a single table
pub fn source_columns(schema: &TableSchema, alias: Option<&str>) -> Vec<SourceColumn> {
    schema
        .columns
        .values()
        .map(|c| SourceColumn {
            table: schema.name.clone(),
            alias: alias.map(str::to_lowercase),
            column: c.name.clone(),
            data_type: c.data_type,
        })
        .collect()
}

/// Outcome of looking a column reference up in a row layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(usize),
    /// The qualifier names no source
    UnknownTable,
    UnknownColumn,
    Ambiguous,
}

/// Find the row position a column reference points at
pub fn lookup(columns: &[SourceColumn], reference: &ColumnRef) -> Lookup {
    let name = reference.column.to_lowercase();
    let qualifier = reference.table.as_ref().map(|q| q.to_lowercase());

    if let Some(q) = &qualifier {
        if !columns.iter().any(|c| c.matches_qualifier(q)) {
            return Lookup::UnknownTable;
        }
    }

    let mut found = columns.iter().enumerate().filter(|(_, c)| {
        c.column == name && qualifier.as_deref().map_or(true, |q| c.matches_qualifier(q))
    });

    match (found.next(), found.next()) {
        (None, _) => Lookup::UnknownColumn,
        (Some((idx, _)), None) => Lookup::Found(idx),
        (Some(_), Some(_)) => Lookup::Ambiguous,
    }
}

fn resolve(columns: &[SourceColumn], reference: &ColumnRef) -> Result<usize> {
    match lookup(columns, reference) {
        Lookup::Found(idx) => Ok(idx),
        Lookup::UnknownTable => Err(Error::WhereTableNotSpecified),
        Lookup::UnknownColumn => Err(Error::UnknownColumnInWhere),
        Lookup::Ambiguous => Err(Error::AmbiguousReference),
    }
}

static NULL: Value = Value::Null;

/// Operand with its column reference resolved
#[derive(Debug, Clone, PartialEq)]
pub enum BoundOperand {
    Column(usize),
    Value(Value),
}

impl BoundOperand {
    fn value<'a>(&'a self, row: &'a [Value]) -> &'a Value {
        match self {
            BoundOperand::Column(idx) => row.get(*idx).unwrap_or(&NULL),
            BoundOperand::Value(value) => value,
        }
    }
}

/// A WHERE clause bound to a row layout
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Or(Vec<BoundExpr>),
    And(Vec<BoundExpr>),
    Not(Box<BoundExpr>),
    Compare {
        left: BoundOperand,
        op: CompOp,
        right: BoundOperand,
    },
    IsNull {
        index: usize,
        negated: bool,
    },
}

impl BoundExpr {
    /// Bind `expr` against `columns`
    pub fn bind(expr: &BoolExpr, columns: &[SourceColumn]) -> Result<Self> {
        let terms = expr
            .terms
            .iter()
            .map(|term| {
                let factors = term
                    .factors
                    .iter()
                    .map(|factor| bind_factor(factor, columns))
                    .collect::<Result<Vec<_>>>()?;
                Ok(BoundExpr::And(factors))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BoundExpr::Or(terms))
    }

    /// Evaluate against one row laid out as the bound columns
    pub fn evaluate(&self, row: &[Value]) -> bool {
        match self {
            BoundExpr::Or(terms) => terms.iter().any(|t| t.evaluate(row)),
            BoundExpr::And(factors) => factors.iter().all(|f| f.evaluate(row)),
            BoundExpr::Not(inner) => !inner.evaluate(row),
            BoundExpr::Compare { left, op, right } => {
                match left.value(row).compare(right.value(row)) {
                    Some(ordering) => apply(*op, ordering),
                    None => false,
                }
            }
            BoundExpr::IsNull { index, negated } => {
                let is_null = row.get(*index).map_or(true, Value::is_null);
                is_null != *negated
            }
        }
    }
}

fn bind_factor(factor: &BoolFactor, columns: &[SourceColumn]) -> Result<BoundExpr> {
    let bound = match &factor.test {
        BoolTest::Nested(expr) => BoundExpr::bind(expr, columns)?,
        BoolTest::Predicate(predicate) => bind_predicate(predicate, columns)?,
    };
    Ok(if factor.negated {
        BoundExpr::Not(Box::new(bound))
    } else {
        bound
    })
}

fn bind_predicate(predicate: &Predicate, columns: &[SourceColumn]) -> Result<BoundExpr> {
    match predicate {
        Predicate::NullCheck { column, negated } => Ok(BoundExpr::IsNull {
            index: resolve(columns, column)?,
            negated: *negated,
        }),
        Predicate::Comparison { left, op, right } => {
            let (left, left_kind) = bind_operand(left, columns)?;
            let (right, right_kind) = bind_operand(right, columns)?;
            if let (Some(l), Some(r)) = (left_kind, right_kind) {
                if l != r {
                    return Err(Error::IncomparableTypes);
                }
            }
            Ok(BoundExpr::Compare {
                left,
                op: *op,
                right,
            })
        }
    }
}

/// Bound operand plus its kind; `None` for a NULL literal, which is
/// comparable with anything
fn bind_operand(
    operand: &Operand,
    columns: &[SourceColumn],
) -> Result<(BoundOperand, Option<ValueKind>)> {
    match operand {
        Operand::Column(reference) => {
            let idx = resolve(columns, reference)?;
            Ok((BoundOperand::Column(idx), Some(columns[idx].data_type.kind())))
        }
        Operand::Literal(literal) => {
            Ok((BoundOperand::Value(operand_value(literal)?), literal.kind()))
        }
    }
}

fn apply(op: CompOp, ordering: Ordering) -> bool {
    match op {
        CompOp::Eq => ordering == Ordering::Equal,
        CompOp::Neq => ordering != Ordering::Equal,
        CompOp::Lt => ordering == Ordering::Less,
        CompOp::Gt => ordering == Ordering::Greater,
        CompOp::Lte => ordering != Ordering::Greater,
        CompOp::Gte => ordering != Ordering::Less,
    }
}
