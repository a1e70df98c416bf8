//! Key-value codec: the store's tagged attribute format to and from native values.
//!
//! Decoding is lenient at attribute granularity. An attribute with an
//! unsupported tag or a malformed payload decodes to `Value::Null` and is
//! logged, so one bad attribute never hides the rest of an item.

use std::collections::BTreeMap;

use dyno_core::value::{Item, Number, Value};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// An item in wire form.
pub type WireItem = BTreeMap<String, AttributeValue>;

/// A tagged attribute value as the store transmits it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "M")]
    M(BTreeMap<String, AttributeValue>),
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    /// Base64 payload.
    #[serde(rename = "B")]
    B(String),
    #[serde(rename = "BS")]
    Bs(Vec<String>),
    /// A tag this client does not understand, kept for diagnostics.
    #[serde(skip)]
    Unknown(String),
}

impl AttributeValue {
    pub fn tag(&self) -> &str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::M(_) => "M",
            Self::L(_) => "L",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::B(_) => "B",
            Self::Bs(_) => "BS",
            Self::Unknown(tag) => tag,
        }
    }

    /// Read one attribute from its JSON wire form (`{"S": "x"}`).
    /// Anything unrecognised becomes [`AttributeValue::Unknown`].
    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;

        let Some(obj) = json.as_object().filter(|o| o.len() == 1) else {
            return Self::Unknown("<malformed>".to_string());
        };
        let Some((tag, payload)) = obj.iter().next() else {
            return Self::Unknown("<malformed>".to_string());
        };

        let strings = |p: &Json| -> Option<Vec<String>> {
            p.as_array()?
                .iter()
                .map(|s| s.as_str().map(str::to_string))
                .collect()
        };

        let decoded = match tag.as_str() {
            "S" => payload.as_str().map(|s| Self::S(s.to_string())),
            "N" => payload.as_str().map(|s| Self::N(s.to_string())),
            "BOOL" => payload.as_bool().map(Self::Bool),
            "NULL" => payload.as_bool().map(Self::Null),
            "M" => payload.as_object().map(|m| {
                Self::M(m.iter().map(|(k, v)| (k.clone(), Self::from_json(v))).collect())
            }),
            "L" => payload
                .as_array()
                .map(|l| Self::L(l.iter().map(Self::from_json).collect())),
            "SS" => strings(payload).map(Self::Ss),
            "NS" => strings(payload).map(Self::Ns),
            "B" => payload.as_str().map(|s| Self::B(s.to_string())),
            "BS" => strings(payload).map(Self::Bs),
            _ => None,
        };
        decoded.unwrap_or_else(|| Self::Unknown(tag.clone()))
    }
}

/// Parse a JSON object of wire attributes into a [`WireItem`].
pub fn wire_item_from_json(json: &serde_json::Value) -> Option<WireItem> {
    json.as_object().map(|obj| {
        obj.iter()
            .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
            .collect()
    })
}

/// A single attribute could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unsupported attribute type '{tag}'")]
    Unsupported { tag: String },

    #[error("invalid number payload '{text}'")]
    InvalidNumber { text: String },
}

/// Strict decode: any unsupported or malformed attribute fails.
pub fn try_decode(av: &AttributeValue) -> Result<Value, CodecError> {
    let number = |text: &str| {
        Number::parse(text)
            .map(Value::Number)
            .map_err(|_| CodecError::InvalidNumber {
                text: text.to_string(),
            })
    };

    match av {
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        AttributeValue::N(n) => number(n),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::M(map) => map
            .iter()
            .map(|(k, v)| try_decode(v).map(|v| (k.clone(), v)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Value::Map),
        AttributeValue::L(list) => list
            .iter()
            .map(try_decode)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        AttributeValue::Ss(set) => Ok(Value::List(set.iter().cloned().map(Value::String).collect())),
        AttributeValue::Ns(set) => set
            .iter()
            .map(|n| number(n))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        AttributeValue::B(_) | AttributeValue::Bs(_) | AttributeValue::Unknown(_) => {
            Err(CodecError::Unsupported {
                tag: av.tag().to_string(),
            })
        }
    }
}

/// Lenient decode: failures become `Value::Null` at the smallest enclosing attribute.
pub fn decode(av: &AttributeValue) -> Value {
    decode_at("", av)
}

/// `path` names the attribute in warnings, dotted for nested members.
fn decode_at(path: &str, av: &AttributeValue) -> Value {
    let child = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}.{key}")
        }
    };
    match av {
        AttributeValue::M(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), decode_at(&child(k), v)))
                .collect(),
        ),
        AttributeValue::L(list) => Value::List(
            list.iter()
                .enumerate()
                .map(|(i, v)| decode_at(&child(&i.to_string()), v))
                .collect(),
        ),
        other => try_decode(other).unwrap_or_else(|e| {
            warn!(attribute = path, error = %e, "attribute decoded as null");
            Value::Null
        }),
    }
}

pub fn decode_item(item: &WireItem) -> Item {
    item.iter()
        .map(|(name, av)| (name.clone(), decode_at(name, av)))
        .collect()
}

pub fn encode(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.as_str().to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::List(items) => AttributeValue::L(items.iter().map(encode).collect()),
        Value::Map(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), encode(v)))
                .collect(),
        ),
    }
}

pub fn encode_item(item: &Item) -> WireItem {
    item.iter()
        .map(|(k, v)| (k.clone(), encode(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyno_core::value::item;
    use serde_json::json;

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(&AttributeValue::S("a".into())), Value::from("a"));
        assert_eq!(
            decode(&AttributeValue::N("12345678901234567890".into())),
            Value::Number(Number::parse("12345678901234567890").unwrap())
        );
        assert_eq!(decode(&AttributeValue::Bool(true)), Value::Bool(true));
        assert_eq!(decode(&AttributeValue::Null(true)), Value::Null);
    }

    #[test]
    fn test_string_sets_decode_to_lists() {
        let av = AttributeValue::Ss(vec!["x".into(), "y".into()]);
        assert_eq!(decode(&av), Value::List(vec![Value::from("x"), Value::from("y")]));
    }

    #[test]
    fn test_bad_attribute_does_not_hide_item() {
        let mut wire = WireItem::new();
        wire.insert("id".into(), AttributeValue::N("7".into()));
        wire.insert("blob".into(), AttributeValue::B("AAEC".into()));
        wire.insert("broken".into(), AttributeValue::N("not-a-number".into()));
        wire.insert(
            "nested".into(),
            AttributeValue::M(BTreeMap::from([
                ("ok".to_string(), AttributeValue::S("fine".into())),
                ("bad".to_string(), AttributeValue::Unknown("XYZ".into())),
            ])),
        );

        let item = decode_item(&wire);
        assert_eq!(item["id"], Value::from(7));
        assert_eq!(item["blob"], Value::Null);
        assert_eq!(item["broken"], Value::Null);
        let Value::Map(nested) = &item["nested"] else {
            panic!("nested should stay a map");
        };
        assert_eq!(nested["ok"], Value::from("fine"));
        assert_eq!(nested["bad"], Value::Null);
    }

    #[test]
    fn test_item_and_map_decode_agree() {
        let wire = WireItem::from([
            ("id".to_string(), AttributeValue::N("7".into())),
            ("blob".to_string(), AttributeValue::B("AAEC".into())),
            (
                "list".to_string(),
                AttributeValue::L(vec![
                    AttributeValue::S("x".into()),
                    AttributeValue::N("not-a-number".into()),
                ]),
            ),
        ]);
        assert_eq!(
            decode(&AttributeValue::M(wire.clone())),
            Value::Map(decode_item(&wire))
        );
        assert_eq!(
            decode_item(&wire)["list"],
            Value::List(vec![Value::from("x"), Value::Null])
        );
    }

    #[test]
    fn test_strict_decode_reports_tag() {
        let err = try_decode(&AttributeValue::Bs(vec![])).unwrap_err();
        assert_eq!(err, CodecError::Unsupported { tag: "BS".into() });
    }

    #[test]
    fn test_from_json_wire_format() {
        let wire = wire_item_from_json(&json!({
            "id": {"N": "1"},
            "name": {"S": "a"},
            "tags": {"L": [{"S": "t"}, {"BOOL": false}]},
            "weird": {"Q": 1},
            "two": {"S": "a", "N": "1"}
        }))
        .unwrap();
        assert_eq!(wire["id"], AttributeValue::N("1".into()));
        assert_eq!(wire["weird"], AttributeValue::Unknown("Q".into()));
        assert!(matches!(wire["two"], AttributeValue::Unknown(_)));

        let item = decode_item(&wire);
        assert_eq!(item["weird"], Value::Null);
        assert_eq!(item["tags"], Value::List(vec![Value::from("t"), Value::Bool(false)]));
    }

    #[test]
    fn test_encode_item_serializes_as_wire_json() {
        let it = item([("id", Value::from(42)), ("ok", Value::Bool(true))]);
        let text = serde_json::to_value(encode_item(&it)).unwrap();
        assert_eq!(text, json!({"id": {"N": "42"}, "ok": {"BOOL": true}}));
    }
}
