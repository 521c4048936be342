//! SQL statement trees
//!
//! Statements arrive already parsed; this module only defines their shapes.

pub mod ast;

pub use ast::Statement;
