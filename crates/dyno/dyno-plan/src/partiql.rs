//! PartiQL literal formatting.
//!
//! Every value spliced into a statement goes through [`format_value`]. String
//! literals double embedded single quotes; numbers are emitted as plain decimal
//! text; only scalars are accepted.

use dyno_core::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("cannot format a {type_name} value as a PartiQL scalar literal")]
    UnsupportedValueType { type_name: &'static str },
}

/// Render a scalar as a PartiQL literal.
pub fn format_value(value: &Value) -> Result<String, FormatError> {
    match value {
        Value::String(s) => Ok(quote_string(s)),
        Value::Number(n) => Ok(n.to_plain_decimal()),
        Value::Bool(true) => Ok("true".to_string()),
        Value::Bool(false) => Ok("false".to_string()),
        other => Err(FormatError::UnsupportedValueType {
            type_name: other.type_name(),
        }),
    }
}

/// `'text'` with each `'` doubled.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// `"name"` with each `"` doubled, for table and attribute names.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyno_core::Number;
    use proptest::prelude::*;

    fn num(text: &str) -> Value {
        Value::Number(Number::parse(text).unwrap())
    }

    #[test]
    fn test_format_strings() {
        assert_eq!(format_value(&Value::from("abc")).unwrap(), "'abc'");
        assert_eq!(format_value(&Value::from("o'neil")).unwrap(), "'o''neil'");
        assert_eq!(format_value(&Value::from("")).unwrap(), "''");
    }

    #[test]
    fn test_format_numbers_without_exponent_or_trailing_zeros() {
        assert_eq!(format_value(&num("42")).unwrap(), "42");
        assert_eq!(format_value(&num("42.0")).unwrap(), "42");
        assert_eq!(format_value(&num("3.1400")).unwrap(), "3.14");
        assert_eq!(format_value(&num("1e3")).unwrap(), "1000");
        assert_eq!(format_value(&num("-2.5E-2")).unwrap(), "-0.025");
        assert_eq!(
            format_value(&num("12345678901234567890123")).unwrap(),
            "12345678901234567890123"
        );
    }

    #[test]
    fn test_format_bools() {
        assert_eq!(format_value(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(format_value(&Value::Bool(false)).unwrap(), "false");
    }

    #[test]
    fn test_composites_and_null_rejected() {
        assert_eq!(
            format_value(&Value::List(vec![])),
            Err(FormatError::UnsupportedValueType { type_name: "list" })
        );
        assert!(format_value(&Value::Null).is_err());
        assert!(format_value(&Value::Map(Default::default())).is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    proptest! {
        #[test]
        fn quotes_are_always_doubled(s in ".*") {
            let literal = format_value(&Value::from(s.as_str())).unwrap();
            prop_assert!(literal.starts_with('\'') && literal.ends_with('\''));
            let body = &literal[1..literal.len() - 1];
            // Inside the literal every quote comes in a pair.
            prop_assert!(body.split("''").all(|chunk| !chunk.contains('\'')));
            prop_assert_eq!(body.replace("''", "'"), s);
        }
    }
}
