//! # dyno-plan
//!
//! Query planning safety for dynotui.
//! The plan contract returned by the planner, the validator that rejects
//! unsafe plans, key-template substitution, PartiQL literal formatting, and
//! the two-phase workflow state machine.

pub mod partiql;
pub mod schema;
pub mod substitution;
pub mod validation;
pub mod workflow;

pub use partiql::{format_value, FormatError};
pub use schema::RawPlanResult;
pub use substitution::{substitute, substitute_all, ItemSubstitutionError, SubstitutionError};
pub use validation::{validate, PlanBlock, PlanDefect, PlanValidationError, ValidatedPlan};
pub use workflow::{step, Effect, Step, WorkflowError, WorkflowEvent, WorkflowState};
