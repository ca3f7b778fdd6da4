//! Provider-facing request shape, produced by normalizing a [`super::prompt::Prompt`].

use std::collections::HashMap;

use super::message::Message;
use super::schema::OutputSchema;
use super::tools::{Tool, ToolChoice};
use crate::error::LlmError;

/// Sampling parameters common across chat-completion providers.
#[derive(Debug, Clone, Default)]
pub struct SamplingParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub stop_sequences: Vec<String>,
    pub seed: Option<u64>,
}

impl SamplingParams {
    pub fn validate(&self) -> Result<(), LlmError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(LlmError::ConfigurationError(format!(
                    "temperature must be within [0.0, 2.0], got {t}"
                )));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(LlmError::ConfigurationError(format!(
                    "top_p must be within [0.0, 1.0], got {p}"
                )));
            }
        }
        for (name, value) in [
            ("frequency_penalty", self.frequency_penalty),
            ("presence_penalty", self.presence_penalty),
        ] {
            if let Some(v) = value {
                if !(-2.0..=2.0).contains(&v) {
                    return Err(LlmError::ConfigurationError(format!(
                        "{name} must be within [-2.0, 2.0], got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// How the provider should constrain (and the caller should interpret) the
/// generated output.
#[derive(Debug, Clone, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
    JsonSchema(OutputSchema),
}

/// Controls whether the raw wire request/response are kept on the result.
/// Default retains both.
#[derive(Debug, Clone, Copy)]
pub struct Retention {
    pub request_body: bool,
    pub response_body: bool,
}

impl Default for Retention {
    fn default() -> Self {
        Self { request_body: true, response_body: true }
    }
}

/// The normalized options passed to [`crate::traits::LanguageModel::generate`]
/// and [`crate::traits::LanguageModel::stream`].
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
    pub sampling: SamplingParams,
    pub response_format: ResponseFormat,
    /// Pass-through options keyed by provider name (e.g. `"openai"`).
    pub provider_options: HashMap<String, serde_json::Value>,
    pub retention: Retention,
}

impl GenerateOptions {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            tool_choice: ToolChoice::default(),
            sampling: SamplingParams::default(),
            response_format: ResponseFormat::default(),
            provider_options: HashMap::new(),
            retention: Retention::default(),
        }
    }
}
