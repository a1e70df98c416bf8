//! Turning model text into a plan result.

use dyno_plan::RawPlanResult;

use crate::error::PlannerError;

/// Remove a surrounding markdown code fence, if the model added one.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parse model output into the raw plan contract. Structure is not checked
/// here; the validator owns that.
pub fn parse_plan_text(text: &str) -> Result<RawPlanResult, PlannerError> {
    let body = strip_code_fence(text);
    serde_json::from_str(body).map_err(|e| PlannerError::MalformedJson {
        message: e.to_string(),
        raw: body.to_string(),
    })
}
