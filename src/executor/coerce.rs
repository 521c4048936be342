//! Literal coercion
//!
//! Turns literal leaves into stored values, either for a target column
//! (INSERT, UPDATE) or as a bare comparison operand (WHERE).

use crate::catalog::Column;
use crate::error::{Error, Result};
use crate::sql::ast::Literal;
use crate::storage::tuple::{contains_reserved, parse_date, truncate_chars};
use crate::storage::Value;

/// Coerce a literal into a value for `column`.
///
/// NULL needs a nullable column, every other literal must match the
/// column's kind. Strings lose their quotes, are checked for reserved
/// characters and are cut to the column length.
pub fn literal_to_value(literal: &Literal, column: &Column) -> Result<Value> {
    if let Some(kind) = literal.kind() {
        if kind != column.data_type.kind() {
            return Err(Error::TypeMismatch);
        }
    }

    match literal {
        Literal::Null if column.nullable => Ok(Value::Null),
        Literal::Null => Err(Error::NotNullable(column.name.clone())),
        Literal::Str(text) => {
            let text = unquote(text);
            if contains_reserved(text) {
                return Err(Error::ReservedCharacter(column.name.clone()));
            }
            let text = match column.data_type.max_len() {
                Some(max) => truncate_chars(text, max),
                None => text.to_string(),
            };
            Ok(Value::Str(text))
        }
        _ => operand_value(literal),
    }
}

/// Value of a literal used as a comparison operand
pub fn operand_value(literal: &Literal) -> Result<Value> {
    match literal {
        Literal::Null => Ok(Value::Null),
        Literal::Int(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::TypeMismatch),
        Literal::Str(text) => Ok(Value::Str(unquote(text).to_string())),
        Literal::Date(text) => {
            parse_date(text).ok_or(Error::TypeMismatch)?;
            Ok(Value::Date(text.clone()))
        }
    }
}

/// Strip one pair of matching surrounding quotes
fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;

    #[test]
    fn test_string_is_unquoted_and_truncated() {
        let column = Column::new("title", DataType::Char(5));
        let value = literal_to_value(&Literal::string("Inception"), &column).unwrap();
        assert_eq!(value, Value::Str("Incep".to_string()));

        let value = literal_to_value(&Literal::Str("\"Heat\"".to_string()), &column).unwrap();
        assert_eq!(value, Value::Str("Heat".to_string()));
    }

    #[test]
    fn test_null_handling() {
        let nullable = Column::new("title", DataType::Char(5));
        assert_eq!(literal_to_value(&Literal::Null, &nullable).unwrap(), Value::Null);

        let key = Column::new("id", DataType::Int).primary_key(true);
        assert!(matches!(
            literal_to_value(&Literal::Null, &key),
            Err(Error::NotNullable(name)) if name == "id"
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let column = Column::new("id", DataType::Int);
        assert!(matches!(
            literal_to_value(&Literal::string("1"), &column),
            Err(Error::TypeMismatch)
        ));

        let column = Column::new("opened", DataType::Date);
        assert!(matches!(
            literal_to_value(&Literal::int(20200101), &column),
            Err(Error::TypeMismatch)
        ));
        assert_eq!(
            literal_to_value(&Literal::date("2020-02-29"), &column).unwrap(),
            Value::Date("2020-02-29".to_string())
        );
    }

    #[test]
    fn test_reserved_characters_rejected() {
        let column = Column::new("title", DataType::Char(10));
        assert!(matches!(
            literal_to_value(&Literal::string("a*b"), &column),
            Err(Error::ReservedCharacter(_))
        ));
        assert!(matches!(
            literal_to_value(&Literal::string("a\0"), &column),
            Err(Error::ReservedCharacter(_))
        ));
    }

    #[test]
    fn test_operand_values() {
        assert_eq!(operand_value(&Literal::int(-4)).unwrap(), Value::Int(-4));
        assert_eq!(
            operand_value(&Literal::string("a*b")).unwrap(),
            Value::Str("a*b".to_string())
        );
        assert!(operand_value(&Literal::date("2021-02-29")).is_err());
        assert_eq!(operand_value(&Literal::Null).unwrap(), Value::Null);
    }
}
