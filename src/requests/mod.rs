//! Generative request client.
//!
//! Every call to the generative service goes through [`GenerativeClient`]:
//! build a prompt from typed inputs, optionally declare an output schema,
//! send it through a [`ChatGateway`], and parse the text that comes back.
//! Structured responses that do not parse fail with
//! [`RequestError::MalformedResponse`]; the caller decides what to do next.

pub mod explain;
pub mod json;
pub mod metrics;
pub mod predict;
pub mod sample;
pub mod suggest;
pub mod target;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::gateway::{
    Attribution, ChatGateway, ChatModel, ChatRequest, ProviderError, ResponseSchema,
};
use crate::prompts::PromptInstance;

pub use explain::ExplainInput;
pub use json::extract_json;
pub use metrics::{MetricValue, MetricsReport};
pub use sample::{FeatureRow, FeatureValue};
pub use suggest::ModelSuggestions;
pub use target::resolve_target_column;

// =============================================================================
// Config
// =============================================================================

/// Settings for the generative request client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Model id sent to the provider.
    pub model: String,
    /// Sampling temperature for every request.
    pub temperature: f32,
    /// Output cap for short and structured requests.
    pub max_tokens: u32,
    /// Output cap for workflow explanations (they carry a full code block).
    pub explanation_max_tokens: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: "google/gemini-2.5-flash".into(),
            temperature: 0.4,
            max_tokens: 2048,
            explanation_max_tokens: 8192,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `MLGUIDE_MODEL` and `MLGUIDE_TEMPERATURE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("MLGUIDE_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }
        if let Some(t) = std::env::var("MLGUIDE_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
        {
            config.temperature = t.clamp(0.0, 2.0);
        }
        config
    }
}

// =============================================================================
// Errors
// =============================================================================

/// The six logical requests the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SuggestModels,
    IdentifyTargetColumn,
    ExplainWorkflow,
    GenerateMetrics,
    GenerateSampleRow,
    GeneratePrediction,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SuggestModels => "suggest_models",
            Operation::IdentifyTargetColumn => "identify_target_column",
            Operation::ExplainWorkflow => "explain_workflow",
            Operation::GenerateMetrics => "generate_metrics",
            Operation::GenerateSampleRow => "generate_sample_row",
            Operation::GeneratePrediction => "generate_prediction",
        }
    }

    fn caller(&self) -> &'static str {
        match self {
            Operation::SuggestModels => "requests::suggest_models",
            Operation::IdentifyTargetColumn => "requests::identify_target_column",
            Operation::ExplainWorkflow => "requests::explain_workflow",
            Operation::GenerateMetrics => "requests::generate_metrics",
            Operation::GenerateSampleRow => "requests::generate_sample_row",
            Operation::GeneratePrediction => "requests::generate_prediction",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("LLM call failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("malformed {operation} response: {message}")]
    MalformedResponse {
        operation: Operation,
        message: String,
    },
}

impl RequestError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, RequestError::MalformedResponse { .. })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Issues prompts to the generative service. Cheap to clone.
#[derive(Clone)]
pub struct GenerativeClient {
    gateway: Arc<dyn ChatGateway>,
    config: ClientConfig,
    session_id: Option<Uuid>,
    pass: Option<u64>,
}

impl GenerativeClient {
    pub fn new(gateway: Arc<dyn ChatGateway>, config: ClientConfig) -> Self {
        Self {
            gateway,
            config,
            session_id: None,
            pass: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A copy whose requests are attributed to one session and workflow pass.
    pub fn for_pass(&self, session_id: Uuid, pass: u64) -> Self {
        Self {
            session_id: Some(session_id),
            pass: Some(pass),
            ..self.clone()
        }
    }

    fn request(&self, operation: Operation, prompt: &PromptInstance, max_tokens: u32) -> ChatRequest {
        let mut attribution = Attribution::new(operation.caller());
        if let Some(session_id) = self.session_id {
            attribution = attribution.with_session(session_id);
        }
        if let Some(pass) = self.pass {
            attribution = attribution.with_pass(pass);
        }

        ChatRequest::new(
            ChatModel::openrouter(&self.config.model),
            prompt.to_messages(),
            attribution,
        )
        .temperature(self.config.temperature)
        .max_tokens(max_tokens)
    }

    /// Free-text request. Returns the response content untouched.
    async fn complete_text(
        &self,
        operation: Operation,
        prompt: PromptInstance,
        max_tokens: u32,
    ) -> Result<String, RequestError> {
        let req = self.request(operation, &prompt, max_tokens);
        let resp = self.gateway.chat(req).await?;
        Ok(resp.content)
    }

    /// Schema-constrained request parsed into `T`.
    async fn complete_structured<T: DeserializeOwned>(
        &self,
        operation: Operation,
        prompt: PromptInstance,
        schema: ResponseSchema,
    ) -> Result<T, RequestError> {
        let req = self
            .request(operation, &prompt, self.config.max_tokens)
            .schema(schema);
        let resp = self.gateway.chat(req).await?;
        json::parse_structured(operation, &resp.content)
    }
}
