//! Statement trees consumed by the engine
//!
//! These are the shapes a statement parser produces. Identifiers may arrive
//! in any case; the engine lowercases them. Literal leaves carry their
//! lexical text: digit text for integers, quoted text for strings and
//! `YYYY-MM-DD` for dates.

use crate::catalog::{DataType, ValueKind};
use crate::storage::tuple::probe_literal;

/// A statement, one variant per kind
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// DROP TABLE statement
    DropTable(String),
    /// DESC table
    Describe(String),
    /// SHOW TABLES
    ShowTables,
    /// INSERT statement
    Insert(InsertStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// SELECT statement
    Select(SelectStatement),
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// Column definitions, in declared order
    pub columns: Vec<ColumnDef>,
    /// Table constraints
    pub constraints: Vec<TableConstraint>,
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    /// NOT NULL constraint
    pub not_null: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// Table-level constraint
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    /// PRIMARY KEY (columns)
    PrimaryKey { columns: Vec<String> },
    /// FOREIGN KEY (columns) REFERENCES ref_table (ref_columns)
    ForeignKey {
        columns: Vec<String>,
        ref_table: String,
        ref_columns: Vec<String>,
    },
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name
    pub table_name: String,
    /// Column names (optional)
    pub columns: Option<Vec<String>>,
    /// Values to insert
    pub values: Vec<Literal>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table name
    pub table_name: String,
    /// WHERE clause
    pub where_clause: Option<BoolExpr>,
}

/// UPDATE statement: `UPDATE t SET column = value [WHERE ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table_name: String,
    pub column: String,
    pub value: Literal,
    pub where_clause: Option<BoolExpr>,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Select list; empty means every column of every source
    pub columns: Vec<SelectColumn>,
    /// FROM clause
    pub from: Vec<TableRef>,
    /// WHERE clause
    pub where_clause: Option<BoolExpr>,
}

/// A single column in the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub column: ColumnRef,
    /// Output alias (`AS name`)
    pub alias: Option<String>,
}

impl From<ColumnRef> for SelectColumn {
    fn from(column: ColumnRef) -> Self {
        Self {
            column,
            alias: None,
        }
    }
}

/// Table reference
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Table name
    pub name: String,
    /// Optional alias
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Column reference, optionally qualified by a table name or alias
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// Literal leaf, carrying its lexical text
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// NULL
    Null,
    /// Integer digits
    Int(String),
    /// String including its surrounding quotes
    Str(String),
    /// `YYYY-MM-DD`
    Date(String),
}

impl Literal {
    pub fn int(value: i64) -> Self {
        Literal::Int(value.to_string())
    }

    /// String literal from unquoted text
    pub fn string(text: &str) -> Self {
        Literal::Str(format!("'{}'", text))
    }

    pub fn date(text: &str) -> Self {
        Literal::Date(text.to_string())
    }

    /// Build a literal from raw token text by probing its kind
    pub fn from_token(text: &str) -> Self {
        if text.eq_ignore_ascii_case("null") {
            return Literal::Null;
        }
        match probe_literal(text) {
            ValueKind::Int => Literal::Int(text.to_string()),
            ValueKind::Date => Literal::Date(text.to_string()),
            ValueKind::Str => Literal::Str(text.to_string()),
        }
    }

    /// Kind of a non-null literal
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Literal::Null => None,
            Literal::Int(_) => Some(ValueKind::Int),
            Literal::Str(_) => Some(ValueKind::Str),
            Literal::Date(_) => Some(ValueKind::Date),
        }
    }
}

/// `term (OR term)*`
#[derive(Debug, Clone, PartialEq)]
pub struct BoolExpr {
    pub terms: Vec<BoolTerm>,
}

/// `factor (AND factor)*`
#[derive(Debug, Clone, PartialEq)]
pub struct BoolTerm {
    pub factors: Vec<BoolFactor>,
}

/// `[NOT] test`
#[derive(Debug, Clone, PartialEq)]
pub struct BoolFactor {
    pub negated: bool,
    pub test: BoolTest,
}

/// `predicate | '(' boolExpr ')'`
#[derive(Debug, Clone, PartialEq)]
pub enum BoolTest {
    Predicate(Predicate),
    Nested(Box<BoolExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        left: Operand,
        op: CompOp,
        right: Operand,
    },
    /// `column IS [NOT] NULL`
    NullCheck { column: ColumnRef, negated: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Literal),
    Column(ColumnRef),
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl BoolExpr {
    /// A WHERE clause made of a single predicate
    pub fn predicate(predicate: Predicate) -> Self {
        BoolFactor::new(BoolTest::Predicate(predicate)).into()
    }

    /// `left op right`
    pub fn compare(left: Operand, op: CompOp, right: Operand) -> Self {
        Self::predicate(Predicate::Comparison { left, op, right })
    }

    /// Disjunction of terms
    pub fn or(terms: Vec<BoolTerm>) -> Self {
        Self { terms }
    }
}

impl BoolTerm {
    /// Conjunction of factors
    pub fn and(factors: Vec<BoolFactor>) -> Self {
        Self { factors }
    }
}

impl BoolFactor {
    pub fn new(test: BoolTest) -> Self {
        Self {
            negated: false,
            test,
        }
    }

    pub fn not(test: BoolTest) -> Self {
        Self {
            negated: true,
            test,
        }
    }
}

impl From<BoolFactor> for BoolTerm {
    fn from(factor: BoolFactor) -> Self {
        BoolTerm {
            factors: vec![factor],
        }
    }
}

impl From<BoolFactor> for BoolExpr {
    fn from(factor: BoolFactor) -> Self {
        BoolExpr {
            terms: vec![factor.into()],
        }
    }
}

impl From<Predicate> for BoolFactor {
    fn from(predicate: Predicate) -> Self {
        BoolFactor::new(BoolTest::Predicate(predicate))
    }
}
