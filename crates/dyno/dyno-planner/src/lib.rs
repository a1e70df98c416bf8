//! # dyno-planner
//!
//! Natural-language planning for dynotui. A [`Planner`] turns an operator
//! request plus the current table's key schema into a raw plan result. The
//! result is untrusted; `dyno_plan::validate` decides whether it may run.

pub mod bedrock;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod scripted;

use async_trait::async_trait;
use dyno_core::TableDescriptor;
use dyno_plan::RawPlanResult;

pub use bedrock::BedrockPlanner;
pub use error::PlannerError;
pub use parse::{parse_plan_text, strip_code_fence};
pub use prompt::{build_prompt, schema_description};
pub use scripted::ScriptedPlanner;

/// The planning collaborator.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        request: &str,
        table: &TableDescriptor,
    ) -> Result<RawPlanResult, PlannerError>;
}

#[async_trait]
impl<P: Planner + ?Sized> Planner for std::sync::Arc<P> {
    async fn plan(
        &self,
        request: &str,
        table: &TableDescriptor,
    ) -> Result<RawPlanResult, PlannerError> {
        (**self).plan(request, table).await
    }
}
