//! The discovery-then-mutate workflow as a pure state machine.
//!
//! [`step`] maps `(state, event)` to the next state and at most one side
//! effect. An adapter performs the effect and feeds its result back as the
//! next event, so the whole lifecycle is testable without a store or a
//! terminal.

pub mod machine;
pub mod state;

pub use machine::step;
pub use state::{Effect, Phase, Step, WorkflowError, WorkflowEvent, WorkflowState};
