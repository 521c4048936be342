//! Statement execution module
//!
//! This module contains the execution engine and its statement handlers:
//! - Schema statements (`ddl`)
//! - Row statements (`dml`, `select`)
//! - WHERE binding and evaluation (`eval`)
//! - Literal coercion (`coerce`)

pub mod coerce;
mod ddl;
mod dml;
pub mod eval;
pub mod executor;
mod select;

pub use executor::{ExecutionEngine, QueryResult};
