//! Workflow states, events and side effects.

use dyno_core::{Item, RemoteCallError};
use dyno_storage::BatchOutcome;
use thiserror::Error;

use crate::schema::RawPlanResult;
use crate::substitution::ItemSubstitutionError;
use crate::validation::{PlanBlock, PlanValidationError};

/// One slot per session: at most one request is in flight at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    /// Waiting for the planner.
    Planning { request: String },
    /// Direct statements await the operator.
    StatementConfirmPending { statements: Vec<String> },
    ExecutingStatements { statements: Vec<String> },
    /// A two-phase plan's read half awaits the operator.
    ReadConfirmPending { plan: PlanBlock },
    Reading { plan: PlanBlock },
    /// The discovery set awaits write confirmation.
    WriteConfirmPending { plan: PlanBlock, discovered: Vec<Item> },
    /// Generated statements are being submitted. The discovery set is gone.
    Writing { plan: PlanBlock, statements: Vec<String> },
    Error(WorkflowError),
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning { .. } => "planning",
            Self::StatementConfirmPending { .. } => "statement_confirm_pending",
            Self::ExecutingStatements { .. } => "executing_statements",
            Self::ReadConfirmPending { .. } => "read_confirm_pending",
            Self::Reading { .. } => "reading",
            Self::WriteConfirmPending { .. } => "write_confirm_pending",
            Self::Writing { .. } => "writing",
            Self::Error(_) => "error",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// A remote call is outstanding; operator input is rejected.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Planning { .. }
                | Self::ExecutingStatements { .. }
                | Self::Reading { .. }
                | Self::Writing { .. }
        )
    }

    pub fn awaits_confirmation(&self) -> bool {
        matches!(
            self,
            Self::StatementConfirmPending { .. }
                | Self::ReadConfirmPending { .. }
                | Self::WriteConfirmPending { .. }
        )
    }

    /// The pending discovery set, if any.
    pub fn discovered(&self) -> Option<&[Item]> {
        match self {
            Self::WriteConfirmPending { discovered, .. } => Some(discovered),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Something that happened: operator input or a completed side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Submit { request: String },
    PlannerReturned(RawPlanResult),
    PlannerFailed { message: String },
    Confirm,
    Decline,
    StatementCompleted { items: Vec<Item> },
    StatementFailed(RemoteCallError),
    ReadCompleted { items: Vec<Item> },
    ReadFailed(RemoteCallError),
    BatchCompleted(BatchOutcome),
    Acknowledge,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::PlannerReturned(_) => "planner_returned",
            Self::PlannerFailed { .. } => "planner_failed",
            Self::Confirm => "confirm",
            Self::Decline => "decline",
            Self::StatementCompleted { .. } => "statement_completed",
            Self::StatementFailed(_) => "statement_failed",
            Self::ReadCompleted { .. } => "read_completed",
            Self::ReadFailed(_) => "read_failed",
            Self::BatchCompleted(_) => "batch_completed",
            Self::Acknowledge => "acknowledge",
        }
    }
}

/// A side effect for the adapter to perform. Remote effects answer with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Answer with `PlannerReturned` or `PlannerFailed`.
    InvokePlanner { request: String },
    /// Answer with `StatementCompleted` or `StatementFailed`.
    ExecuteStatement { statement: String },
    /// Answer with `ReadCompleted` or `ReadFailed`.
    ExecuteRead { statement: String },
    /// Answer with `BatchCompleted`.
    SubmitBatch { statements: Vec<String> },
    ShowItems { items: Vec<Item> },
    ShowOutcome(BatchOutcome),
    ShowRefusal { reason: String },
}

impl Effect {
    /// Whether the effect is a remote call that must be answered with an event.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::InvokePlanner { .. }
                | Self::ExecuteStatement { .. }
                | Self::ExecuteRead { .. }
                | Self::SubmitBatch { .. }
        )
    }
}

/// Where a remote failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Statement,
    Read,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Statement => "statement",
            Self::Read => "read",
        })
    }
}

/// A fatal workflow error, held until the operator acknowledges it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("planner failed: {message}")]
    Planner { message: String },

    #[error(transparent)]
    Validation(#[from] PlanValidationError),

    #[error("write aborted before submission: {0}")]
    Substitution(#[from] ItemSubstitutionError),

    #[error("{phase} failed: {error}")]
    Remote { phase: Phase, error: RemoteCallError },
}

impl WorkflowError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Planner { .. } => "planner",
            Self::Validation(_) => "validation",
            Self::Substitution(_) => "substitution",
            Self::Remote { .. } => "remote",
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { error, .. } => error.is_retryable(),
            Self::Planner { .. } => true,
            Self::Validation(_) | Self::Substitution(_) => false,
        }
    }
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: WorkflowState,
    pub effect: Option<Effect>,
    /// `false` when the event does not apply to the state; the state is unchanged.
    pub accepted: bool,
}

impl Step {
    pub(crate) fn to(state: WorkflowState) -> Self {
        Self {
            state,
            effect: None,
            accepted: true,
        }
    }

    pub(crate) fn with(state: WorkflowState, effect: Effect) -> Self {
        Self {
            state,
            effect: Some(effect),
            accepted: true,
        }
    }

    pub(crate) fn rejected(state: WorkflowState) -> Self {
        Self {
            state,
            effect: None,
            accepted: false,
        }
    }
}
