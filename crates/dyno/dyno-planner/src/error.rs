//! Planner error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner credentials missing: set {env_var}")]
    MissingCredentials { env_var: String },

    #[error("planner request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("planner endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("planner returned no content")]
    EmptyResponse,

    #[error("planner output is not a plan result: {message} (raw={raw})")]
    MalformedJson { message: String, raw: String },

    #[error("scripted planner has no response left for '{request}'")]
    Exhausted { request: String },
}

impl PlannerError {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::Request(_) => "request",
            Self::Status { .. } => "status",
            Self::EmptyResponse => "empty_response",
            Self::MalformedJson { .. } => "malformed_json",
            Self::Exhausted { .. } => "exhausted",
        }
    }
}
