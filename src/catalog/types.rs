//! Data types for kvrel
//!
//! This module defines the column types supported by the database.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Integer
    Int,
    /// Character string with a maximum length
    Char(usize),
    /// Calendar date, `YYYY-MM-DD`
    Date,
}

/// Comparable family of a value, shared by literals and columns.
///
/// Two operands can only be compared when their kinds are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Str,
    Date,
}

impl DataType {
    /// The value kind stored by a column of this type
    pub fn kind(&self) -> ValueKind {
        match self {
            DataType::Int => ValueKind::Int,
            DataType::Char(_) => ValueKind::Str,
            DataType::Date => ValueKind::Date,
        }
    }

    /// Maximum character length, for `char(n)` columns
    pub fn max_len(&self) -> Option<usize> {
        match self {
            DataType::Char(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Char(n) => write!(f, "char({})", n),
            DataType::Date => write!(f, "date"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(DataType::Int.to_string(), "int");
        assert_eq!(DataType::Char(20).to_string(), "char(20)");
        assert_eq!(DataType::Date.to_string(), "date");
    }

    #[test]
    fn test_type_kind() {
        assert_eq!(DataType::Char(3).kind(), ValueKind::Str);
        assert_eq!(DataType::Char(3).max_len(), Some(3));
        assert_eq!(DataType::Int.max_len(), None);
        // char types of different lengths are the same kind but not the same type
        assert_eq!(DataType::Char(3).kind(), DataType::Char(9).kind());
        assert_ne!(DataType::Char(3), DataType::Char(9));
    }
}
