//! Key-template substitution: one validated template plus one discovered item
//! gives one concrete statement.

use dyno_core::constants::{PK_PLACEHOLDER, SK_PLACEHOLDER};
use dyno_core::{Item, TableDescriptor};
use thiserror::Error;

use crate::partiql::{format_value, FormatError};
use crate::validation::KeyTemplate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstitutionError {
    #[error("item has no value for key attribute '{attribute}'")]
    MissingKeyAttribute { attribute: String },

    #[error("key attribute '{attribute}' holds a {type_name}, which cannot be used as a key literal")]
    UnsupportedValueType {
        attribute: String,
        type_name: &'static str,
    },
}

/// Substitution failed for one item of a discovery set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("discovered item {} of {total}: {source}", .index + 1)]
pub struct ItemSubstitutionError {
    /// Zero-based position in the discovery set.
    pub index: usize,
    pub total: usize,
    pub source: SubstitutionError,
}

fn key_literal(item: &Item, attribute: &str) -> Result<String, SubstitutionError> {
    let value = item
        .get(attribute)
        .filter(|v| !v.is_null())
        .ok_or_else(|| SubstitutionError::MissingKeyAttribute {
            attribute: attribute.to_string(),
        })?;
    format_value(value).map_err(|FormatError::UnsupportedValueType { type_name }| {
        SubstitutionError::UnsupportedValueType {
            attribute: attribute.to_string(),
            type_name,
        }
    })
}

/// Fill `{{PK}}` (and `{{SK}}` when the table has a sort key) from `item`.
///
/// Placeholders are replaced in a single pass over the template, so text
/// inside a substituted key value is never scanned for placeholders.
pub fn substitute(
    template: &KeyTemplate,
    item: &Item,
    table: &TableDescriptor,
) -> Result<String, SubstitutionError> {
    let pk = key_literal(item, table.partition_key_name())?;
    let sk = match table.sort_key_name() {
        Some(name) => Some(key_literal(item, name)?),
        None => None,
    };

    let mut statement = String::with_capacity(template.as_str().len() + pk.len());
    let mut rest = template.as_str();
    while let Some(pos) = rest.find("{{") {
        statement.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(PK_PLACEHOLDER) {
            statement.push_str(&pk);
            rest = after;
        } else if let (Some(sk), Some(after)) = (&sk, tail.strip_prefix(SK_PLACEHOLDER)) {
            statement.push_str(sk);
            rest = after;
        } else {
            statement.push_str("{{");
            rest = &tail[2..];
        }
    }
    statement.push_str(rest);
    Ok(statement)
}

/// Substitute every item in order. The first failure aborts the whole set.
pub fn substitute_all(
    template: &KeyTemplate,
    items: &[Item],
    table: &TableDescriptor,
) -> Result<Vec<String>, ItemSubstitutionError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            substitute(template, item, table).map_err(|source| ItemSubstitutionError {
                index,
                total: items.len(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyno_core::value::item;
    use dyno_core::{KeyAttribute, KeyType, Value};
    use proptest::prelude::*;

    fn pk_only() -> TableDescriptor {
        TableDescriptor::new("T", KeyAttribute::new("id", KeyType::Number), None)
    }

    fn pk_sk() -> TableDescriptor {
        TableDescriptor::new(
            "T",
            KeyAttribute::new("pk", KeyType::String),
            Some(KeyAttribute::new("sk", KeyType::String)),
        )
    }

    fn template(text: &str) -> KeyTemplate {
        KeyTemplate::new_validated(text.to_string())
    }

    #[test]
    fn test_substitute_partition_key() {
        let row = item([("id", Value::from(42)), ("age", Value::from(7))]);
        let stmt = substitute(&template(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#), &row, &pk_only())
            .unwrap();
        assert_eq!(stmt, r#"DELETE FROM "T" WHERE "id" = 42"#);
    }

    #[test]
    fn test_substitute_both_keys_every_occurrence() {
        let row = item([("pk", Value::from("user#1")), ("sk", Value::from("o'rder"))]);
        let stmt = substitute(
            &template(r#"UPDATE "T" SET "x" = 1 WHERE "pk" = {{PK}} AND "sk" = {{SK}} AND "pk" = {{PK}}"#),
            &row,
            &pk_sk(),
        )
        .unwrap();
        assert_eq!(
            stmt,
            r#"UPDATE "T" SET "x" = 1 WHERE "pk" = 'user#1' AND "sk" = 'o''rder' AND "pk" = 'user#1'"#
        );
    }

    #[test]
    fn test_missing_key_attribute() {
        let row = item([("pk", Value::from("a"))]);
        let err = substitute(&template("{{PK}} {{SK}}"), &row, &pk_sk()).unwrap_err();
        assert_eq!(
            err,
            SubstitutionError::MissingKeyAttribute {
                attribute: "sk".into()
            }
        );
        let null_key = item([("id", Value::Null)]);
        assert!(substitute(&template("{{PK}}"), &null_key, &pk_only()).is_err());
    }

    #[test]
    fn test_composite_key_value_rejected() {
        let row = item([("id", Value::List(vec![Value::from(1)]))]);
        assert_eq!(
            substitute(&template("{{PK}}"), &row, &pk_only()),
            Err(SubstitutionError::UnsupportedValueType {
                attribute: "id".into(),
                type_name: "list"
            })
        );
    }

    #[test]
    fn test_substitute_all_reports_first_failing_item() {
        let items = vec![
            item([("id", Value::from(1))]),
            item([("other", Value::from(2))]),
            item([("id", Value::from(3))]),
        ];
        let err = substitute_all(&template("DELETE {{PK}}"), &items, &pk_only()).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(
            err.to_string(),
            "discovered item 2 of 3: item has no value for key attribute 'id'"
        );
    }

    #[test]
    fn test_key_values_are_not_rescanned() {
        let row = item([("pk", Value::from("{{SK}}")), ("sk", Value::from("b"))]);
        let stmt = substitute(&template("{{PK}}/{{SK}}"), &row, &pk_sk()).unwrap();
        assert_eq!(stmt, "'{{SK}}'/'b'");
    }

    proptest! {
        #[test]
        fn substituted_quotes_are_doubled(value in ".*'.*") {
            let row = item([("pk", Value::from(value.as_str())), ("sk", Value::from("s"))]);
            let stmt = substitute(&template("WHERE \"pk\" = {{PK}}"), &row, &pk_sk()).unwrap();
            let literal = stmt.strip_prefix("WHERE \"pk\" = ").unwrap();
            prop_assert_eq!(literal.len(), value.len() + value.matches('\'').count() + 2);
            let body = &literal[1..literal.len() - 1];
            prop_assert!(body.split("''").all(|chunk| !chunk.contains('\'')));
        }
    }
}
