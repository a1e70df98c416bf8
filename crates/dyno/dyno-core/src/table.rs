//! Table descriptors: a snapshot of one table's key schema and metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Item, Value};

/// Scalar attribute types allowed for key attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "S")]
    String,
    #[serde(rename = "N")]
    Number,
    #[serde(rename = "B")]
    Binary,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "S" => Some(Self::String),
            "N" => Some(Self::Number),
            "B" => Some(Self::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key attribute: name plus declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    pub key_type: KeyType,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
        }
    }
}

/// Immutable snapshot of a table, fetched once per table-list refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub region: String,
    pub approx_item_count: u64,
    pub secondary_indexes: Vec<String>,
    pub status: String,
}

impl TableDescriptor {
    /// A descriptor with only the key schema filled in.
    pub fn new(
        name: impl Into<String>,
        partition_key: KeyAttribute,
        sort_key: Option<KeyAttribute>,
    ) -> Self {
        Self {
            name: name.into(),
            partition_key,
            sort_key,
            region: String::new(),
            approx_item_count: 0,
            secondary_indexes: Vec::new(),
            status: "ACTIVE".to_string(),
        }
    }

    pub fn has_sort_key(&self) -> bool {
        self.sort_key.is_some()
    }

    pub fn partition_key_name(&self) -> &str {
        &self.partition_key.name
    }

    pub fn sort_key_name(&self) -> Option<&str> {
        self.sort_key.as_ref().map(|k| k.name.as_str())
    }

    /// Names of the full primary key, partition key first.
    pub fn key_names(&self) -> Vec<&str> {
        let mut names = vec![self.partition_key.name.as_str()];
        if let Some(sk) = &self.sort_key {
            names.push(sk.name.as_str());
        }
        names
    }

    /// Extract the full primary key from an item. `None` when any key
    /// attribute is absent or null.
    pub fn key_of(&self, item: &Item) -> Option<Item> {
        let mut key = Item::new();
        for name in self.key_names() {
            match item.get(name) {
                Some(v) if !v.is_null() => {
                    key.insert(name.to_string(), v.clone());
                }
                _ => return None,
            }
        }
        Some(key)
    }

    /// Whether two items address the same record.
    pub fn same_key(&self, a: &Item, b: &Item) -> bool {
        self.key_names().into_iter().all(|name| {
            let left = a.get(name).unwrap_or(&Value::Null);
            let right = b.get(name).unwrap_or(&Value::Null);
            left == right
        })
    }
}
