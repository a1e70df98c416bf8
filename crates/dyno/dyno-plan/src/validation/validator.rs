//! Plan validator: the safety boundary between the planner and the store.
//!
//! Checks run in a fixed order and the first failure is reported. Nothing
//! here touches the store.

use dyno_core::constants::{PK_PLACEHOLDER, SK_PLACEHOLDER};
use dyno_core::TableDescriptor;
use tracing::{debug, warn};

use super::defects::{PlanDefect, PlanValidationError};
use super::types::{
    KeyTemplate, Operation, PlanBlock, ReadPlan, ReadProjection, Safety, SafetyReason,
    ValidatedPlan, WriteAction, WritePlan,
};
use crate::schema::{RawPlanBlock, RawPlanResult, RawWriteBlock};

/// Validate a raw plan result against the table it will run on.
pub fn validate(
    raw: &RawPlanResult,
    table: &TableDescriptor,
) -> Result<ValidatedPlan, PlanValidationError> {
    let result = check(raw, table);
    match &result {
        Ok(plan) => debug!(table = %table.name, kind = plan_kind(plan), "plan accepted"),
        Err(err) => warn!(table = %table.name, defect = err.defect.as_str(), "plan rejected"),
    }
    result
}

fn plan_kind(plan: &ValidatedPlan) -> &'static str {
    match plan {
        ValidatedPlan::Statements(_) => "statements",
        ValidatedPlan::TwoPhase(block) => block.operation.as_str(),
        ValidatedPlan::Refusal { .. } => "refusal",
    }
}

fn refusal_reason(raw: &RawPlanResult) -> Option<&str> {
    raw.refusal
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
}

fn check(raw: &RawPlanResult, table: &TableDescriptor) -> Result<ValidatedPlan, PlanValidationError> {
    let mode = raw.mode.trim().to_ascii_lowercase();
    // An executable result must not also claim the request was refused.
    if matches!(mode.as_str(), "sql" | "plan") && refusal_reason(raw).is_some() {
        return Err(PlanDefect::RefusalAlongsidePayload { mode }.into());
    }
    match mode.as_str() {
        "sql" => check_sql(raw),
        "plan" => {
            if raw.statements.iter().any(|s| !s.trim().is_empty()) {
                return Err(PlanDefect::PlanWithStatements.into());
            }
            let block = raw.plan.as_ref().ok_or(PlanDefect::PlanMissing)?;
            check_plan(block, table).map(ValidatedPlan::TwoPhase)
        }
        "refusal" => {
            if !raw.statements.is_empty() || raw.plan.is_some() {
                return Err(PlanDefect::RefusalWithPayload.into());
            }
            let reason = refusal_reason(raw).ok_or(PlanDefect::RefusalWithoutReason)?;
            Ok(ValidatedPlan::Refusal {
                reason: reason.to_string(),
            })
        }
        other => Err(PlanDefect::UnknownMode {
            mode: other.to_string(),
        }
        .into()),
    }
}

fn check_sql(raw: &RawPlanResult) -> Result<ValidatedPlan, PlanValidationError> {
    if raw.statements.is_empty() {
        return Err(PlanDefect::SqlWithoutStatements.into());
    }
    if raw.plan.is_some() {
        return Err(PlanDefect::SqlWithPlan.into());
    }
    let statements: Vec<String> = raw
        .statements
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if statements.is_empty() {
        return Err(PlanDefect::EmptyStatementsAfterFilter.into());
    }
    if statements.len() < raw.statements.len() {
        debug!(dropped = raw.statements.len() - statements.len(), "dropped empty statements");
    }
    Ok(ValidatedPlan::Statements(statements))
}

fn unquote(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
}

fn check_plan(block: &RawPlanBlock, table: &TableDescriptor) -> Result<PlanBlock, PlanValidationError> {
    let plan_table = unquote(&block.table);
    if plan_table != table.name {
        return Err(PlanDefect::TableMismatch {
            plan_table: plan_table.to_string(),
            current_table: table.name.clone(),
        }
        .into());
    }

    let operation = Operation::parse(&block.operation).ok_or_else(|| PlanDefect::UnknownOperation {
        operation: block.operation.clone(),
    })?;

    let write = match (operation, &block.write) {
        (Operation::ScanThenWrite, None) => return Err(PlanDefect::MissingWriteBlock.into()),
        (Operation::Select, Some(_)) => return Err(PlanDefect::WriteOnSelect.into()),
        (Operation::ScanThenWrite, Some(write)) => Some(check_write(write, table)?),
        (Operation::Select, None) => None,
    };

    let statement = block.read.partiql.trim();
    if statement.is_empty() {
        return Err(PlanDefect::EmptyReadStatement.into());
    }

    let safety = Safety {
        needs_confirmation: block.safety.needs_confirmation,
        reason: SafetyReason::parse(&block.safety.reason),
    };
    if block.read.requires_scan
        && !(safety.needs_confirmation && safety.reason == SafetyReason::FullTableScan)
    {
        return Err(PlanDefect::ScanWithoutConfirmation.into());
    }

    let projection = ReadProjection::from_list(&block.read.projection);
    if write.is_some() {
        if let Some(missing) = table
            .key_names()
            .into_iter()
            .find(|name| !projection.includes(name))
        {
            return Err(PlanDefect::ProjectionMissingKey {
                attribute: missing.to_string(),
            }
            .into());
        }
    }

    Ok(PlanBlock {
        table: table.name.clone(),
        operation,
        read: ReadPlan {
            statement: statement.to_string(),
            requires_scan: block.read.requires_scan,
            index: block
                .read
                .index
                .as_deref()
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .map(str::to_string),
            projection,
        },
        write,
        safety,
    })
}

fn check_write(write: &RawWriteBlock, table: &TableDescriptor) -> Result<WritePlan, PlanValidationError> {
    let action = match write.action.trim().to_ascii_lowercase().as_str() {
        "update" => WriteAction::Update,
        "delete" => WriteAction::Delete,
        "insert" => return Err(PlanDefect::InsertInTwoPhaseWrite.into()),
        other => {
            return Err(PlanDefect::UnknownWriteAction {
                action: other.to_string(),
            }
            .into())
        }
    };

    let template = write.per_item.partiql_template.trim();
    for placeholder in placeholders(template) {
        let resolvable = placeholder == PK_PLACEHOLDER
            || (placeholder == SK_PLACEHOLDER && table.has_sort_key());
        if !resolvable {
            return Err(PlanDefect::UnresolvablePlaceholder {
                placeholder: placeholder.to_string(),
            }
            .into());
        }
    }
    if !template.contains(PK_PLACEHOLDER) {
        return Err(PlanDefect::MissingPkPlaceholder.into());
    }
    if table.has_sort_key() && !template.contains(SK_PLACEHOLDER) {
        return Err(PlanDefect::MissingSkPlaceholder.into());
    }

    Ok(WritePlan {
        action,
        template: KeyTemplate::new_validated(template.to_string()),
    })
}

/// Every `{{...}}` occurrence in `template`, including an unterminated tail.
fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start..];
        match after.find("}}") {
            Some(end) => {
                found.push(&after[..end + 2]);
                rest = &after[end + 2..];
            }
            None => {
                found.push(after);
                break;
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawPerItem, RawReadBlock, RawSafetyBlock};
    use dyno_core::{KeyAttribute, KeyType};

    fn pk_only() -> TableDescriptor {
        TableDescriptor::new("T", KeyAttribute::new("id", KeyType::Number), None)
    }

    fn pk_sk() -> TableDescriptor {
        TableDescriptor::new(
            "T",
            KeyAttribute::new("id", KeyType::Number),
            Some(KeyAttribute::new("age", KeyType::Number)),
        )
    }

    fn two_phase(template: &str, projection: &[&str]) -> RawPlanResult {
        RawPlanResult::plan(RawPlanBlock {
            table: "T".into(),
            operation: "scan_then_write".into(),
            read: RawReadBlock {
                partiql: r#"SELECT * FROM "T" WHERE "status" = 'inactive'"#.into(),
                requires_scan: true,
                index: None,
                projection: projection.iter().map(|s| s.to_string()).collect(),
            },
            write: Some(RawWriteBlock {
                action: "delete".into(),
                per_item: RawPerItem {
                    partiql_template: template.into(),
                },
            }),
            safety: RawSafetyBlock {
                needs_confirmation: true,
                reason: "full_table_scan".into(),
            },
        })
    }

    fn defect(raw: &RawPlanResult, table: &TableDescriptor) -> &'static str {
        validate(raw, table).unwrap_err().defect.as_str()
    }

    #[test]
    fn test_sql_mode_drops_empty_statements() {
        let raw = RawPlanResult::sql(["  ", r#"DELETE FROM "T" WHERE "id" = 1"#, ""]);
        assert_eq!(
            validate(&raw, &pk_only()).unwrap(),
            ValidatedPlan::Statements(vec![r#"DELETE FROM "T" WHERE "id" = 1"#.into()])
        );
    }

    #[test]
    fn test_sql_mode_structure() {
        assert_eq!(defect(&RawPlanResult::sql(Vec::<String>::new()), &pk_only()), "sql_without_statements");
        assert_eq!(defect(&RawPlanResult::sql(["", " "]), &pk_only()), "empty_statements_after_filter");
        let mut raw = RawPlanResult::sql(["SELECT * FROM \"T\""]);
        raw.plan = Some(RawPlanBlock::default());
        assert_eq!(defect(&raw, &pk_only()), "sql_with_plan");
    }

    #[test]
    fn test_plan_mode_structure() {
        let raw = RawPlanResult {
            mode: "plan".into(),
            ..RawPlanResult::default()
        };
        assert_eq!(defect(&raw, &pk_only()), "plan_missing");
        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        raw.statements = vec!["SELECT 1".into()];
        assert_eq!(defect(&raw, &pk_only()), "plan_with_statements");
    }

    #[test]
    fn test_refusal_mode() {
        assert_eq!(
            validate(&RawPlanResult::refusal("aggregations are not supported"), &pk_only()).unwrap(),
            ValidatedPlan::Refusal {
                reason: "aggregations are not supported".into()
            }
        );
        assert_eq!(defect(&RawPlanResult::refusal("  "), &pk_only()), "refusal_without_reason");
        let mut raw = RawPlanResult::refusal("no");
        raw.statements = vec!["x".into()];
        assert_eq!(defect(&raw, &pk_only()), "refusal_with_payload");
    }

    #[test]
    fn test_executable_modes_reject_refusal_reason() {
        let mut raw = RawPlanResult::sql([r#"DELETE FROM "T" WHERE "id" = 1"#]);
        raw.refusal = Some("cannot do this safely".into());
        assert_eq!(defect(&raw, &pk_only()), "refusal_alongside_payload");

        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        raw.refusal = Some("joins are not supported".into());
        let err = validate(&raw, &pk_only()).unwrap_err();
        assert_eq!(
            err.defect,
            PlanDefect::RefusalAlongsidePayload { mode: "plan".into() }
        );

        // A blank refusal field is treated as absent.
        let mut raw = RawPlanResult::sql([r#"DELETE FROM "T" WHERE "id" = 1"#]);
        raw.refusal = Some("   ".into());
        assert!(validate(&raw, &pk_only()).is_ok());
    }

    #[test]
    fn test_unknown_mode_and_operation() {
        let raw = RawPlanResult {
            mode: "yolo".into(),
            ..RawPlanResult::default()
        };
        assert_eq!(defect(&raw, &pk_only()), "unknown_mode");

        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        if let Some(plan) = raw.plan.as_mut() {
            plan.operation = "scan_then_drop".into();
        }
        assert_eq!(defect(&raw, &pk_only()), "unknown_operation");
    }

    #[test]
    fn test_scan_then_write_requires_write_block() {
        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        if let Some(plan) = raw.plan.as_mut() {
            plan.write = None;
        }
        assert_eq!(defect(&raw, &pk_only()), "missing_write_block");
    }

    #[test]
    fn test_select_with_write_block_rejected() {
        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        if let Some(plan) = raw.plan.as_mut() {
            plan.operation = "select".into();
        }
        assert_eq!(defect(&raw, &pk_only()), "write_on_select");
    }

    #[test]
    fn test_sort_key_placeholder_enforced() {
        let missing = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["*"]);
        assert_eq!(defect(&missing, &pk_sk()), "missing_sk_placeholder");

        let both = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}} AND "age" = {{SK}}"#, &["*"]);
        let ValidatedPlan::TwoPhase(plan) = validate(&both, &pk_sk()).unwrap() else {
            panic!("expected two-phase plan");
        };
        assert_eq!(plan.write.unwrap().action, WriteAction::Delete);
    }

    #[test]
    fn test_unresolvable_placeholders() {
        let invented = two_phase(r#"UPDATE "T" SET "ts" = {{NOW}} WHERE "id" = {{PK}}"#, &["id"]);
        assert_eq!(defect(&invented, &pk_only()), "unresolvable_placeholder");

        let sk_without_sort_key =
            two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}} AND "x" = {{SK}}"#, &["id"]);
        assert_eq!(defect(&sk_without_sort_key, &pk_only()), "unresolvable_placeholder");

        let unterminated = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK"#, &["id"]);
        assert_eq!(defect(&unterminated, &pk_only()), "unresolvable_placeholder");

        let no_pk = two_phase(r#"DELETE FROM "T" WHERE "id" = 1"#, &["id"]);
        assert_eq!(defect(&no_pk, &pk_only()), "missing_pk_placeholder");
    }

    #[test]
    fn test_insert_not_allowed_per_item() {
        let mut raw = two_phase(r#"INSERT INTO "T" VALUE {'id': {{PK}}}"#, &["id"]);
        if let Some(write) = raw.plan.as_mut().and_then(|p| p.write.as_mut()) {
            write.action = "insert".into();
        }
        assert_eq!(defect(&raw, &pk_only()), "insert_in_two_phase_write");
    }

    #[test]
    fn test_scan_requires_confirmation() {
        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        if let Some(plan) = raw.plan.as_mut() {
            plan.safety.reason = "multi_item_write".into();
        }
        assert_eq!(defect(&raw, &pk_only()), "scan_without_confirmation");

        if let Some(plan) = raw.plan.as_mut() {
            plan.safety.reason = "full_table_scan".into();
            plan.safety.needs_confirmation = false;
        }
        assert_eq!(defect(&raw, &pk_only()), "scan_without_confirmation");
    }

    #[test]
    fn test_unknown_safety_reason_is_kept() {
        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        if let Some(plan) = raw.plan.as_mut() {
            plan.read.requires_scan = false;
            plan.safety.reason = "bulk_delete".into();
        }
        let ValidatedPlan::TwoPhase(plan) = validate(&raw, &pk_only()).unwrap() else {
            panic!("expected two-phase plan");
        };
        assert_eq!(plan.safety.reason, SafetyReason::Other("bulk_delete".into()));
    }

    #[test]
    fn test_projection_must_carry_key_for_writes() {
        let raw = two_phase(
            r#"DELETE FROM "T" WHERE "id" = {{PK}} AND "age" = {{SK}}"#,
            &["id", "status"],
        );
        let err = validate(&raw, &pk_sk()).unwrap_err();
        assert_eq!(
            err.defect,
            PlanDefect::ProjectionMissingKey {
                attribute: "age".into()
            }
        );
    }

    #[test]
    fn test_table_must_match_and_quotes_are_ignored() {
        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        if let Some(plan) = raw.plan.as_mut() {
            plan.table = "\"T\"".into();
        }
        assert!(validate(&raw, &pk_only()).is_ok());
        if let Some(plan) = raw.plan.as_mut() {
            plan.table = "Other".into();
        }
        assert_eq!(defect(&raw, &pk_only()), "table_mismatch");
    }

    #[test]
    fn test_select_plan_may_project_anything() {
        let raw = RawPlanResult::plan(RawPlanBlock {
            table: "T".into(),
            operation: "select".into(),
            read: RawReadBlock {
                partiql: r#"SELECT "name" FROM "T" WHERE "age" > 30"#.into(),
                requires_scan: true,
                index: Some(" ".into()),
                projection: vec!["name".into()],
            },
            write: None,
            safety: RawSafetyBlock {
                needs_confirmation: true,
                reason: "full_table_scan".into(),
            },
        });
        let ValidatedPlan::TwoPhase(plan) = validate(&raw, &pk_only()).unwrap() else {
            panic!("expected two-phase plan");
        };
        assert_eq!(plan.operation, Operation::Select);
        assert_eq!(plan.read.index, None);
        assert!(!plan.is_write());
    }

    #[test]
    fn test_empty_read_statement_rejected() {
        let mut raw = two_phase(r#"DELETE FROM "T" WHERE "id" = {{PK}}"#, &["id"]);
        if let Some(plan) = raw.plan.as_mut() {
            plan.read.partiql = "   ".into();
        }
        assert_eq!(defect(&raw, &pk_only()), "empty_read_statement");
    }

    #[test]
    fn test_placeholder_scan() {
        assert_eq!(placeholders("a {{PK}} b {{SK}}"), vec!["{{PK}}", "{{SK}}"]);
        assert_eq!(placeholders("no braces"), Vec::<&str>::new());
        assert_eq!(placeholders("x {{ID"), vec!["{{ID"]);
    }
}
