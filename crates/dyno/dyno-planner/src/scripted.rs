//! A planner that replays canned model output.
//!
//! Used for offline sessions and tests. Each call pops the next scripted
//! reply and runs it through the same text parsing as the hosted planner.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dyno_core::TableDescriptor;
use dyno_plan::RawPlanResult;

use crate::error::PlannerError;
use crate::parse::parse_plan_text;
use crate::Planner;

enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Default)]
pub struct ScriptedPlanner {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw model text, fences and all.
    pub fn reply_text(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    /// Queue a structured result.
    pub fn reply(self, result: &RawPlanResult) -> Self {
        let text = serde_json::to_string(result).unwrap_or_default();
        self.reply_text(text)
    }

    /// Queue a transport-style failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Reply::Fail(message.into()));
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(
        &self,
        request: &str,
        _table: &TableDescriptor,
    ) -> Result<RawPlanResult, PlannerError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .ok_or_else(|| PlannerError::Exhausted {
                request: request.to_string(),
            })?;
        match reply {
            Reply::Text(text) => parse_plan_text(&text),
            Reply::Fail(message) => Err(PlannerError::Status {
                status: 503,
                body: message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyno_core::{KeyAttribute, KeyType};

    fn table() -> TableDescriptor {
        TableDescriptor::new("T", KeyAttribute::new("id", KeyType::String), None)
    }

    #[tokio::test]
    async fn test_replies_in_order_then_exhausted() {
        let planner = ScriptedPlanner::new()
            .reply(&RawPlanResult::sql([r#"SELECT * FROM "T""#]))
            .reply_text("```json\n{\"mode\":\"refusal\",\"refusal\":\"no\"}\n```");

        assert_eq!(planner.plan("one", &table()).await.unwrap().mode, "sql");
        assert_eq!(planner.plan("two", &table()).await.unwrap().mode, "refusal");
        let err = planner.plan("three", &table()).await.unwrap_err();
        assert_eq!(err.kind(), "exhausted");
        assert_eq!(planner.requests(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let planner = ScriptedPlanner::new().fail("throttled");
        let err = planner.plan("x", &table()).await.unwrap_err();
        assert_eq!(err.to_string(), "planner endpoint returned 503: throttled");
        assert_eq!(planner.remaining(), 0);
    }
}
