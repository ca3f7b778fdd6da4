//! Tool descriptors, calls, results, and the executor contract.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::types::message::ToolResultPayload;
use crate::types::usage::Usage;

/// Per-call context handed to a [`ToolExecutor`].
///
/// Carries the tool-call id (for error attribution), the usage accumulated by
/// the loop so far, and an opaque caller-supplied value that flows unchanged
/// from the request into every executor and callback.
#[derive(Clone)]
pub struct ToolCallOptions {
    pub tool_call_id: String,
    pub usage_so_far: Usage,
    pub user_context: Option<Arc<dyn Any + Send + Sync>>,
}

/// Executes one tool. Implementations may run concurrently with other
/// executors within the same step; the orchestrator serializes only the
/// ordering of results, not execution itself.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        arguments: serde_json::Value,
        options: &ToolCallOptions,
    ) -> Result<serde_json::Value, LlmError>;
}

#[async_trait]
impl<F, Fut> ToolExecutor for F
where
    F: Fn(serde_json::Value, ToolCallOptions) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<serde_json::Value, LlmError>> + Send,
{
    async fn execute(
        &self,
        arguments: serde_json::Value,
        options: &ToolCallOptions,
    ) -> Result<serde_json::Value, LlmError> {
        (self)(arguments, options.clone()).await
    }
}

/// A tool a model may call. Identity is `name`, which must be unique within a
/// request.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the shape of `arguments`.
    pub parameters: serde_json::Value,
    pub input_examples: Vec<serde_json::Value>,
    /// When true, arguments that don't validate against `parameters` are
    /// rejected before the executor ever runs.
    pub strict: bool,
    /// When true, the provider executes this tool itself; the core forwards
    /// the descriptor verbatim and must not invoke `executor`.
    pub provider_executed: bool,
    pub executor: Option<Arc<dyn ToolExecutor>>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("strict", &self.strict)
            .field("provider_executed", &self.provider_executed)
            .finish()
    }
}

impl Tool {
    pub fn function(name: impl Into<String>, parameters: serde_json::Value) -> ToolBuilder {
        ToolBuilder {
            name: name.into(),
            description: String::new(),
            parameters,
            input_examples: Vec::new(),
            strict: false,
            provider_executed: false,
            executor: None,
        }
    }
}

/// Fluent constructor for [`Tool`].
pub struct ToolBuilder {
    name: String,
    description: String,
    parameters: serde_json::Value,
    input_examples: Vec<serde_json::Value>,
    strict: bool,
    provider_executed: bool,
    executor: Option<Arc<dyn ToolExecutor>>,
}

impl ToolBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn input_example(mut self, example: serde_json::Value) -> Self {
        self.input_examples.push(example);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn provider_executed(mut self, provider_executed: bool) -> Self {
        self.provider_executed = provider_executed;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Tool {
        Tool {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            input_examples: self.input_examples,
            strict: self.strict,
            provider_executed: self.provider_executed,
            executor: self.executor,
        }
    }
}

/// A model-issued invocation of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// The outcome of executing (or forwarding) one [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub id: String,
    pub tool_name: String,
    pub payload: ToolResultPayload,
}

/// How a model should pick among the tools offered to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    Required,
    None,
    Tool { name: String },
}

impl Default for ToolChoice {
    fn default() -> Self {
        Self::Auto
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_executor_runs() {
        let tool = Tool::function("add", serde_json::json!({"type": "object"}))
            .description("adds two numbers")
            .executor(Arc::new(|args: serde_json::Value, _opts: ToolCallOptions| async move {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                Ok(serde_json::json!({ "sum": a + b }))
            }))
            .build();

        let opts = ToolCallOptions {
            tool_call_id: "call_1".into(),
            usage_so_far: Usage::default(),
            user_context: None,
        };
        let result = tool
            .executor
            .unwrap()
            .execute(serde_json::json!({"a": 2, "b": 3}), &opts)
            .await
            .unwrap();
        assert_eq!(result["sum"], 5);
    }

    #[test]
    fn tool_choice_defaults_to_auto() {
        assert_eq!(ToolChoice::default(), ToolChoice::Auto);
    }
}
