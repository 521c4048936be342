//! Tuple and Value types for kvrel
//!
//! Values are stored as text. A row is the `*`-joined encoding of its
//! values in schema order and a row key is the `*`-joined encoding of its
//! primary key values. Null is the sentinel `"\0"`, which no accepted value
//! can encode to.

use bytes::{BufMut, Bytes, BytesMut};
use nom::bytes::complete::take_while_m_n;
use nom::character::complete::char;
use nom::combinator::{all_consuming, map_res};
use nom::sequence::tuple;
use nom::IResult;
use std::cmp::Ordering;
use std::fmt;

use crate::catalog::{DataType, ValueKind};
use crate::error::{Error, Result};

/// Separator between encoded values
pub const DELIMITER: char = '*';

/// Encoded form of NULL
pub const NULL_SENTINEL: &str = "\0";

/// A value in the database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// NULL value
    Null,
    /// Integer value
    Int(i64),
    /// String value, already truncated to its column length
    Str(String),
    /// Date value as `YYYY-MM-DD`
    Date(String),
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Compare two values of the same kind.
    ///
    /// Returns `None` when either side is NULL or the kinds differ.
    /// Dates compare lexicographically, which is chronological for
    /// `YYYY-MM-DD`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Text form written to the store
    pub fn encode(&self) -> String {
        match self {
            Value::Null => NULL_SENTINEL.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Str(s) | Value::Date(s) => s.clone(),
        }
    }

    /// Decode one stored field for a column of `data_type`
    pub fn decode(field: &str, data_type: &DataType) -> Result<Value> {
        if field == NULL_SENTINEL {
            return Ok(Value::Null);
        }
        match data_type {
            DataType::Int => field
                .parse()
                .map(Value::Int)
                .map_err(|_| Error::Corrupted(format!("'{}' is not an int", field))),
            DataType::Char(_) => Ok(Value::Str(field.to_string())),
            DataType::Date => Ok(Value::Date(field.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) | Value::Date(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

/// Probe the kind of a literal token.
///
/// An optionally signed run of digits is an int, a valid `YYYY-MM-DD`
/// calendar date is a date, anything else is a string.
pub fn probe_literal(text: &str) -> ValueKind {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        ValueKind::Int
    } else if parse_date(text).is_some() {
        ValueKind::Date
    } else {
        ValueKind::Str
    }
}

fn fixed_digits<'a>(count: usize) -> impl FnMut(&'a str) -> IResult<&'a str, u32> {
    map_res(
        take_while_m_n(count, count, |c: char| c.is_ascii_digit()),
        str::parse::<u32>,
    )
}

fn date_parts(input: &str) -> IResult<&str, (u32, char, u32, char, u32)> {
    all_consuming(tuple((
        fixed_digits(4),
        char('-'),
        fixed_digits(2),
        char('-'),
        fixed_digits(2),
    )))(input)
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Parse a `YYYY-MM-DD` date into `(year, month, day)`
pub fn parse_date(text: &str) -> Option<(u32, u32, u32)> {
    let (_, (year, _, month, _, day)) = date_parts(text).ok()?;
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return None;
    }
    Some((year, month, day))
}

/// Truncate a string to at most `max_len` characters
pub fn truncate_chars(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// True if a string cannot be stored verbatim
pub fn contains_reserved(s: &str) -> bool {
    s.contains(DELIMITER) || s.contains(NULL_SENTINEL)
}

fn join_encoded<'a>(values: impl Iterator<Item = &'a Value>) -> Bytes {
    let mut buf = BytesMut::new();
    for (i, value) in values.enumerate() {
        if i > 0 {
            buf.put_u8(DELIMITER as u8);
        }
        buf.put_slice(value.encode().as_bytes());
    }
    buf.freeze()
}

/// A tuple (row) in the database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    /// Values in this tuple
    values: Vec<Value>,
}

impl Tuple {
    /// Create a new tuple from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get a value by index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Set a value by index
    pub fn set(&mut self, index: usize, value: Value) {
        if index < self.values.len() {
            self.values[index] = value;
        }
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Project specific columns
    pub fn project(&self, indices: &[usize]) -> Tuple {
        let values = indices
            .iter()
            .filter_map(|&i| self.values.get(i).cloned())
            .collect();
        Tuple::new(values)
    }

    /// Concatenate two tuples
    pub fn concat(&self, other: &Tuple) -> Tuple {
        let mut values = self.values.clone();
        values.extend(other.values.iter().cloned());
        Tuple::new(values)
    }

    /// Encode the full row
    pub fn encode(&self) -> Bytes {
        join_encoded(self.values.iter())
    }

    /// Encode the values at `indices` as a row key
    pub fn key(&self, indices: &[usize]) -> Bytes {
        join_encoded(indices.iter().filter_map(|&i| self.values.get(i)))
    }

    /// Decode a stored row against the column types of its table
    pub fn decode(bytes: &[u8], types: &[DataType]) -> Result<Tuple> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Corrupted(format!("row is not utf-8: {}", e)))?;
        if types.is_empty() {
            return Ok(Tuple::new(Vec::new()));
        }

        let fields: Vec<&str> = text.split(DELIMITER).collect();
        if fields.len() != types.len() {
            return Err(Error::Corrupted(format!(
                "row has {} fields, schema has {} columns",
                fields.len(),
                types.len()
            )));
        }

        fields
            .iter()
            .zip(types)
            .map(|(field, data_type)| Value::decode(field, data_type))
            .collect::<Result<Vec<_>>>()
            .map(Tuple::new)
    }
}

/// Encode a key from values already in key order
pub fn encode_key(values: &[Value]) -> Bytes {
    join_encoded(values.iter())
}
