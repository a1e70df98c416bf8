//! Planner backed by a hosted Nova model on Bedrock.

use async_trait::async_trait;
use dyno_core::config::PlannerConfig;
use dyno_core::TableDescriptor;
use dyno_plan::RawPlanResult;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PlannerError;
use crate::parse::parse_plan_text;
use crate::prompt::build_prompt;
use crate::Planner;

#[derive(Debug, Serialize)]
pub(crate) struct NovaRequest {
    pub messages: Vec<NovaMessage>,
    #[serde(rename = "inferenceConfig")]
    pub inference_config: InferenceConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct NovaMessage {
    pub role: String,
    pub content: Vec<NovaContent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct NovaContent {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct InferenceConfig {
    pub max_new_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NovaResponse {
    pub output: NovaOutput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NovaOutput {
    pub message: NovaMessage,
}

impl NovaRequest {
    fn user_prompt(prompt: String, config: &PlannerConfig) -> Self {
        Self {
            messages: vec![NovaMessage {
                role: "user".to_string(),
                content: vec![NovaContent { text: prompt }],
            }],
            inference_config: InferenceConfig {
                max_new_tokens: config.max_new_tokens,
                temperature: config.temperature,
            },
        }
    }
}

impl NovaResponse {
    fn into_text(self) -> Result<String, PlannerError> {
        self.output
            .message
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or(PlannerError::EmptyResponse)
    }
}

/// Calls the model's invoke endpoint with a bearer token.
pub struct BedrockPlanner {
    client: Client,
    endpoint: String,
    api_key: String,
    config: PlannerConfig,
}

impl BedrockPlanner {
    /// Build from config, reading the bearer token from the configured
    /// environment variable.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, PlannerError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PlannerError::MissingCredentials {
                env_var: config.api_key_env.clone(),
            })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: &PlannerConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, PlannerError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: invoke_endpoint(config),
            api_key: api_key.into(),
            config: config.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// The invoke URL for the configured model, unless overridden.
pub fn invoke_endpoint(config: &PlannerConfig) -> String {
    match &config.endpoint {
        Some(endpoint) => endpoint.clone(),
        None => format!(
            "https://bedrock-runtime.{}.amazonaws.com/model/{}/invoke",
            config.effective_region(),
            config.model_id
        ),
    }
}

#[async_trait]
impl Planner for BedrockPlanner {
    async fn plan(
        &self,
        request: &str,
        table: &TableDescriptor,
    ) -> Result<RawPlanResult, PlannerError> {
        let body = NovaRequest::user_prompt(build_prompt(request, table), &self.config);
        debug!(model = %self.config.model_id, table = %table.name, "invoking planner");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlannerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.json::<NovaResponse>().await?.into_text()?;
        let plan = parse_plan_text(&text)?;
        info!(mode = %plan.mode, table = %table.name, "planner returned");
        Ok(plan)
    }
}
