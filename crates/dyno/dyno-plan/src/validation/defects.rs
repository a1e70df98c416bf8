//! Named plan defects.

use std::fmt;

use thiserror::Error;

/// A specific reason a plan result was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanDefect {
    UnknownMode { mode: String },
    SqlWithoutStatements,
    SqlWithPlan,
    EmptyStatementsAfterFilter,
    PlanMissing,
    PlanWithStatements,
    RefusalWithPayload,
    RefusalWithoutReason,
    RefusalAlongsidePayload { mode: String },
    TableMismatch { plan_table: String, current_table: String },
    UnknownOperation { operation: String },
    EmptyReadStatement,
    MissingWriteBlock,
    WriteOnSelect,
    UnknownWriteAction { action: String },
    InsertInTwoPhaseWrite,
    MissingPkPlaceholder,
    MissingSkPlaceholder,
    UnresolvablePlaceholder { placeholder: String },
    ScanWithoutConfirmation,
    ProjectionMissingKey { attribute: String },
}

impl PlanDefect {
    /// Stable tag for logs and tests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownMode { .. } => "unknown_mode",
            Self::SqlWithoutStatements => "sql_without_statements",
            Self::SqlWithPlan => "sql_with_plan",
            Self::EmptyStatementsAfterFilter => "empty_statements_after_filter",
            Self::PlanMissing => "plan_missing",
            Self::PlanWithStatements => "plan_with_statements",
            Self::RefusalWithPayload => "refusal_with_payload",
            Self::RefusalWithoutReason => "refusal_without_reason",
            Self::RefusalAlongsidePayload { .. } => "refusal_alongside_payload",
            Self::TableMismatch { .. } => "table_mismatch",
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::EmptyReadStatement => "empty_read_statement",
            Self::MissingWriteBlock => "missing_write_block",
            Self::WriteOnSelect => "write_on_select",
            Self::UnknownWriteAction { .. } => "unknown_write_action",
            Self::InsertInTwoPhaseWrite => "insert_in_two_phase_write",
            Self::MissingPkPlaceholder => "missing_pk_placeholder",
            Self::MissingSkPlaceholder => "missing_sk_placeholder",
            Self::UnresolvablePlaceholder { .. } => "unresolvable_placeholder",
            Self::ScanWithoutConfirmation => "scan_without_confirmation",
            Self::ProjectionMissingKey { .. } => "projection_missing_key",
        }
    }
}

impl fmt::Display for PlanDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMode { mode } => write!(f, "unknown mode '{mode}'"),
            Self::SqlWithoutStatements => f.write_str("mode=sql but no statements were returned"),
            Self::SqlWithPlan => f.write_str("mode=sql must not carry a plan"),
            Self::EmptyStatementsAfterFilter => {
                f.write_str("every returned statement was empty")
            }
            Self::PlanMissing => f.write_str("mode=plan but plan is null"),
            Self::PlanWithStatements => f.write_str("mode=plan must not carry statements"),
            Self::RefusalWithPayload => {
                f.write_str("mode=refusal must not carry statements or a plan")
            }
            Self::RefusalWithoutReason => f.write_str("mode=refusal but no reason was given"),
            Self::RefusalAlongsidePayload { mode } => {
                write!(f, "mode={mode} must not carry a refusal reason")
            }
            Self::TableMismatch {
                plan_table,
                current_table,
            } => write!(
                f,
                "plan targets table '{plan_table}' but the current table is '{current_table}'"
            ),
            Self::UnknownOperation { operation } => write!(f, "unknown operation '{operation}'"),
            Self::EmptyReadStatement => f.write_str("plan has an empty read statement"),
            Self::MissingWriteBlock => f.write_str("scan_then_write requires a write block"),
            Self::WriteOnSelect => f.write_str("operation=select must not carry a write block"),
            Self::UnknownWriteAction { action } => write!(f, "unknown write action '{action}'"),
            Self::InsertInTwoPhaseWrite => f.write_str(
                "insert is not allowed in a per-item template; inserts must be direct statements",
            ),
            Self::MissingPkPlaceholder => f.write_str("write template is missing {{PK}}"),
            Self::MissingSkPlaceholder => {
                f.write_str("table has a sort key but the write template is missing {{SK}}")
            }
            Self::UnresolvablePlaceholder { placeholder } => write!(
                f,
                "write template uses {placeholder}, which cannot be filled from a discovered item"
            ),
            Self::ScanWithoutConfirmation => f.write_str(
                "read requires a full scan but safety is not needs_confirmation=true, reason=full_table_scan",
            ),
            Self::ProjectionMissingKey { attribute } => write!(
                f,
                "read projection omits key attribute '{attribute}' needed by the write template"
            ),
        }
    }
}

/// A plan result failed validation. Nothing was executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("plan rejected ({}): {defect}", .defect.as_str())]
pub struct PlanValidationError {
    pub defect: PlanDefect,
}

impl From<PlanDefect> for PlanValidationError {
    fn from(defect: PlanDefect) -> Self {
        Self { defect }
    }
}
