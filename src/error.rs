//! Error types for kvrel
//!
//! Every failure the engine can report is a variant of [`Error`]. DDL
//! errors are detected before any catalog write; DML errors abort only the
//! current statement.

use thiserror::Error;

/// The main error type for kvrel
#[derive(Error, Debug)]
pub enum Error {
    // ========== DDL Errors ==========
    #[error("Create table has failed: table with the same name already exists")]
    TableExists(String),

    #[error("Create table has failed: column definition is duplicated")]
    DuplicateColumn(String),

    #[error("Create table has failed: primary key definition is duplicated")]
    DuplicatePrimaryKey,

    #[error("Create table has failed: '{0}' does not exist in column definition")]
    UnknownColumn(String),

    #[error("Create table has failed: foreign key definition of '{0}' is duplicated")]
    DuplicateForeignKey(String),

    #[error("Create table has failed: foreign key references non existing table")]
    ReferenceTableExistence,

    #[error("Create table has failed: foreign key references non existing column")]
    ReferenceColumnExistence,

    #[error("Create table has failed: foreign key references non primary key column")]
    ReferenceNonPrimaryKey,

    #[error("Create table has failed: foreign key references wrong type")]
    ReferenceType,

    #[error("Char length should be over 0 (column '{0}')")]
    InvalidLength(String),

    #[error("Drop table has failed: '{0}' is referenced by other table")]
    DropReferencedTable(String),

    // ========== DML Errors ==========
    #[error("No such table")]
    NoSuchTable(String),

    #[error("'{0}' does not exist")]
    NoSuchColumn(String),

    #[error("Types are not matched")]
    TypeMismatch,

    #[error("'{0}' is not nullable")]
    NotNullable(String),

    #[error("Value for '{0}' contains a reserved character")]
    ReservedCharacter(String),

    #[error("Primary key duplication")]
    PrimaryKeyDuplicate,

    #[error("Referential integrity violation")]
    ReferentialIntegrityViolation,

    #[error("Selection has failed: fail to resolve '{0}'")]
    SelectColumnResolve(String),

    #[error("Where clause trying to reference tables which are not specified")]
    WhereTableNotSpecified,

    #[error("Where clause contains ambiguous reference")]
    AmbiguousReference,

    #[error("Where clause trying to reference non existing column")]
    UnknownColumnInWhere,

    #[error("Trying to compare incomparable columns or values")]
    IncomparableTypes,

    // ========== Storage Errors ==========
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: corrupted entry - {0}")]
    Corrupted(String),
}

/// Result type alias for kvrel operations
pub type Result<T> = std::result::Result<T, Error>;
