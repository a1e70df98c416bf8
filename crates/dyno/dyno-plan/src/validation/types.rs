//! Validated plan types. Only the validator constructs these.

use std::fmt;

/// An accepted plan result.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedPlan {
    /// Ready-to-run statements, empties already dropped.
    Statements(Vec<String>),
    TwoPhase(PlanBlock),
    Refusal { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    ScanThenWrite,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::ScanThenWrite => "scan_then_write",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "select" => Some(Self::Select),
            "scan_then_write" => Some(Self::ScanThenWrite),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-item write action. Insert never reaches this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Update,
    Delete,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a plan asks for confirmation. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyReason {
    None,
    FullTableScan,
    MultiItemWrite,
    Other(String),
}

impl SafetyReason {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Self::None,
            "full_table_scan" => Self::FullTableScan,
            "multi_item_write" => Self::MultiItemWrite,
            _ => Self::Other(tag.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::FullTableScan => "full_table_scan",
            Self::MultiItemWrite => "multi_item_write",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for SafetyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Safety {
    pub needs_confirmation: bool,
    pub reason: SafetyReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadProjection {
    All,
    Attributes(Vec<String>),
}

impl ReadProjection {
    pub fn from_list(list: &[String]) -> Self {
        if list.iter().any(|a| a.trim() == "*") {
            Self::All
        } else {
            Self::Attributes(list.iter().map(|a| a.trim().to_string()).collect())
        }
    }

    pub fn includes(&self, attribute: &str) -> bool {
        match self {
            Self::All => true,
            Self::Attributes(attrs) => attrs.iter().any(|a| a == attribute),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    pub statement: String,
    pub requires_scan: bool,
    pub index: Option<String>,
    pub projection: ReadProjection,
}

/// A write template that passed placeholder validation against a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate(String);

impl KeyTemplate {
    pub(crate) fn new_validated(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub action: WriteAction,
    pub template: KeyTemplate,
}

/// A validated two-phase plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBlock {
    pub table: String,
    pub operation: Operation,
    pub read: ReadPlan,
    /// Present exactly when `operation` is [`Operation::ScanThenWrite`].
    pub write: Option<WritePlan>,
    pub safety: Safety,
}

impl PlanBlock {
    pub fn is_write(&self) -> bool {
        self.operation == Operation::ScanThenWrite
    }
}
