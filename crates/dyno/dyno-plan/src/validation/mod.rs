//! Plan validation: raw plan results in, typed plans or a named defect out.

pub mod defects;
pub mod types;
pub mod validator;

pub use defects::{PlanDefect, PlanValidationError};
pub use types::{
    KeyTemplate, Operation, PlanBlock, ReadPlan, ReadProjection, Safety, SafetyReason,
    ValidatedPlan, WriteAction, WritePlan,
};
pub use validator::validate;
