//! The plan result contract as the planning collaborator returns it.
//!
//! Every field is optional and every tag is a plain string, so a malformed plan
//! still deserializes and reaches the validator, which names the defect.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level plan result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPlanResult {
    /// `sql`, `plan` or `refusal`.
    #[serde(deserialize_with = "null_as_default")]
    pub mode: String,
    #[serde(deserialize_with = "null_as_default")]
    pub statements: Vec<String>,
    pub plan: Option<RawPlanBlock>,
    /// Human-readable reason when `mode` is `refusal`.
    #[serde(alias = "reason", alias = "refusal_reason")]
    pub refusal: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPlanBlock {
    #[serde(deserialize_with = "null_as_default")]
    pub table: String,
    /// `select` or `scan_then_write`.
    #[serde(deserialize_with = "null_as_default")]
    pub operation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub read: RawReadBlock,
    pub write: Option<RawWriteBlock>,
    #[serde(deserialize_with = "null_as_default")]
    pub safety: RawSafetyBlock,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReadBlock {
    #[serde(deserialize_with = "null_as_default")]
    pub partiql: String,
    #[serde(deserialize_with = "null_as_default")]
    pub requires_scan: bool,
    pub index: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub projection: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawWriteBlock {
    /// `insert`, `update` or `delete`.
    #[serde(deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(deserialize_with = "null_as_default")]
    pub per_item: RawPerItem,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPerItem {
    #[serde(deserialize_with = "null_as_default")]
    pub partiql_template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSafetyBlock {
    #[serde(deserialize_with = "null_as_default")]
    pub needs_confirmation: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub reason: String,
}

/// Treat an explicit JSON `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawPlanResult {
    /// A direct-statement result.
    pub fn sql<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: "sql".to_string(),
            statements: statements.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A two-phase plan result.
    pub fn plan(block: RawPlanBlock) -> Self {
        Self {
            mode: "plan".to_string(),
            plan: Some(block),
            ..Self::default()
        }
    }

    pub fn refusal(reason: impl Into<String>) -> Self {
        Self {
            mode: "refusal".to_string(),
            refusal: Some(reason.into()),
            ..Self::default()
        }
    }
}
