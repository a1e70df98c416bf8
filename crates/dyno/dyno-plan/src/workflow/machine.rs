//! The discovery-then-mutate transition function.

use dyno_core::TableDescriptor;
use tracing::{debug, info, warn};

use super::state::{Effect, Phase, Step, WorkflowError, WorkflowEvent, WorkflowState};
use crate::substitution::substitute_all;
use crate::validation::{validate, ValidatedPlan};

/// Advance the workflow by one event.
///
/// Pure: remote work is requested through the returned [`Effect`] and its
/// result comes back as a later event. `table` is the table the session has
/// open; plans are validated and substituted against it.
pub fn step(state: WorkflowState, event: WorkflowEvent, table: &TableDescriptor) -> Step {
    let from = state.name();
    let event_name = event.name();
    let next = transition(state, event, table);
    if next.accepted {
        debug!(from, to = next.state.name(), event = event_name, "workflow transition");
    } else {
        debug!(state = from, event = event_name, "workflow event ignored");
    }
    next
}

fn transition(state: WorkflowState, event: WorkflowEvent, table: &TableDescriptor) -> Step {
    use WorkflowEvent as E;
    use WorkflowState as S;

    match (state, event) {
        (S::Idle, E::Submit { request }) => {
            let request = request.trim().to_string();
            if request.is_empty() {
                return Step::rejected(S::Idle);
            }
            Step::with(
                S::Planning {
                    request: request.clone(),
                },
                Effect::InvokePlanner { request },
            )
        }

        (S::Planning { .. }, E::PlannerReturned(raw)) => match validate(&raw, table) {
            Err(err) => Step::to(S::Error(err.into())),
            Ok(ValidatedPlan::Statements(statements)) => {
                Step::to(S::StatementConfirmPending { statements })
            }
            Ok(ValidatedPlan::TwoPhase(plan)) => Step::to(S::ReadConfirmPending { plan }),
            Ok(ValidatedPlan::Refusal { reason }) => {
                info!(reason = %reason, "planner refused request");
                Step::with(S::Idle, Effect::ShowRefusal { reason })
            }
        },
        (S::Planning { .. }, E::PlannerFailed { message }) => {
            Step::to(S::Error(WorkflowError::Planner { message }))
        }

        (S::StatementConfirmPending { statements }, E::Confirm) => {
            let effect = match statements.as_slice() {
                [single] => Effect::ExecuteStatement {
                    statement: single.clone(),
                },
                _ => Effect::SubmitBatch {
                    statements: statements.clone(),
                },
            };
            Step::with(S::ExecutingStatements { statements }, effect)
        }
        (S::StatementConfirmPending { .. }, E::Decline) => Step::to(S::Idle),
        (S::ExecutingStatements { .. }, E::StatementCompleted { items }) => {
            Step::with(S::Idle, Effect::ShowItems { items })
        }
        (S::ExecutingStatements { .. }, E::StatementFailed(error)) => {
            Step::to(S::Error(WorkflowError::Remote {
                phase: Phase::Statement,
                error,
            }))
        }
        (S::ExecutingStatements { .. }, E::BatchCompleted(outcome)) => {
            Step::with(S::Idle, Effect::ShowOutcome(outcome))
        }

        (S::ReadConfirmPending { plan }, E::Confirm) => {
            let statement = plan.read.statement.clone();
            Step::with(S::Reading { plan }, Effect::ExecuteRead { statement })
        }
        (S::ReadConfirmPending { .. }, E::Decline) => Step::to(S::Idle),
        (S::Reading { plan }, E::ReadCompleted { items }) => {
            if plan.is_write() && !items.is_empty() {
                info!(discovered = items.len(), "discovery set ready for write confirmation");
                Step::to(S::WriteConfirmPending {
                    plan,
                    discovered: items,
                })
            } else {
                Step::with(S::Idle, Effect::ShowItems { items })
            }
        }
        (S::Reading { .. }, E::ReadFailed(error)) => Step::to(S::Error(WorkflowError::Remote {
            phase: Phase::Read,
            error,
        })),

        (S::WriteConfirmPending { .. }, E::Decline) => Step::to(S::Idle),
        (S::WriteConfirmPending { plan, discovered }, E::Confirm) => {
            let Some(write) = plan.write.as_ref() else {
                // Validation guarantees a write block for scan_then_write plans.
                return Step::with(S::Idle, Effect::ShowItems { items: discovered });
            };
            match substitute_all(&write.template, &discovered, table) {
                Ok(statements) => Step::with(
                    S::Writing {
                        plan,
                        statements: statements.clone(),
                    },
                    Effect::SubmitBatch { statements },
                ),
                Err(err) => {
                    warn!(error = %err, "substitution failed; nothing submitted");
                    Step::to(S::Error(err.into()))
                }
            }
        }
        (S::Writing { .. }, E::BatchCompleted(outcome)) => {
            Step::with(S::Idle, Effect::ShowOutcome(outcome))
        }

        (S::Error(_), E::Acknowledge) => Step::to(S::Idle),

        (state, _) => Step::rejected(state),
    }
}
