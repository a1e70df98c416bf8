//! Conversion between native values and JSON documents.
//!
//! Used to render an item in the detail pane and to accept an item edited as
//! JSON text. serde_json is built with `arbitrary_precision`, so a number
//! crosses into JSON and back with every digit intact.

use std::str::FromStr;

use serde_json::Value as Json;

use super::{Item, Number, Value};

impl Value {
    /// Convert a JSON document into a native value.
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match Number::parse(&n.to_string()) {
                Ok(num) => Self::Number(num),
                Err(_) => Self::Null,
            },
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into a JSON document. Numbers are written as their plain
    /// decimal text.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => number_to_json(n),
            Self::String(s) => Json::String(s.clone()),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(n: &Number) -> Json {
    let text = n.to_plain_decimal();
    match serde_json::Number::from_str(&text) {
        Ok(num) => Json::Number(num),
        Err(_) => Json::String(text),
    }
}

/// Convert an item to a JSON object.
pub fn item_to_json(item: &Item) -> Json {
    Json::Object(
        item.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Parse a JSON object into an item. Returns `None` if the document is not an object.
pub fn item_from_json(json: Json) -> Option<Item> {
    match json {
        Json::Object(map) => Some(
            map.into_iter()
                .map(|(k, v)| (k, Value::from_json(v)))
                .collect(),
        ),
        _ => None,
    }
}

/// Pretty JSON with lexicographically ordered keys.
pub fn render_item(item: &Item) -> String {
    serde_json::to_string_pretty(&item_to_json(item)).unwrap_or_else(|_| "{}".to_string())
}
