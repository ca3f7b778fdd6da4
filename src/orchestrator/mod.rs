//! The tool-loop orchestrator (§4.2): wraps a [`LanguageModel`] into a
//! higher-level operation that runs multiple generate-calls in sequence
//! until a stop condition fires.

mod stop_condition;

pub use stop_condition::{
    evaluate_stop_conditions, CustomStopCondition, HasToolCall, StepCountIs, StopCondition,
    StopContext,
};

use std::any::Any;
use std::sync::Arc;

use futures::future::join_all;

use crate::error::LlmError;
use crate::types::{
    ContentPart, FinishReason, GenerateOptions, GenerateResult, Message, Role, Step, Tool,
    ToolCall, ToolCallOptions, ToolChoice, ToolResult, ToolResultPayload, Usage,
};
use crate::traits::LanguageModel;

const DEFAULT_MAX_STEPS: usize = 8;

/// Inputs to [`run`].
pub struct ToolLoopRequest {
    pub model: Arc<dyn LanguageModel>,
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
    /// Evaluated in order every step; see [`evaluate_stop_conditions`].
    pub stop_conditions: Vec<Arc<dyn StopCondition>>,
    pub max_steps: usize,
    pub user_context: Option<Arc<dyn Any + Send + Sync>>,
    pub on_step_finish: Option<Arc<dyn Fn(&Step) + Send + Sync>>,
    pub on_finish: Option<Arc<dyn Fn(&GenerateResult, &[Step]) + Send + Sync>>,
}

impl ToolLoopRequest {
    pub fn new(model: Arc<dyn LanguageModel>, messages: Vec<Message>) -> Self {
        Self {
            model,
            messages,
            tools: Vec::new(),
            tool_choice: ToolChoice::default(),
            stop_conditions: Vec::new(),
            max_steps: DEFAULT_MAX_STEPS,
            user_context: None,
            on_step_finish: None,
            on_finish: None,
        }
    }
}

/// The full result of a tool loop run.
pub struct ToolLoopResult {
    pub result: GenerateResult,
    pub steps: Vec<Step>,
}

fn assistant_message_from(result: &GenerateResult) -> Message {
    let mut parts = Vec::new();
    if !result.text.is_empty() {
        parts.push(ContentPart::Text { text: result.text.clone() });
    }
    for call in &result.tool_calls {
        parts.push(ContentPart::ToolCall {
            id: call.id.clone(),
            name: call.tool_name.clone(),
            arguments: call.arguments.clone(),
        });
    }
    Message::assistant(parts)
}

async fn execute_tool_calls(
    tools: &[Tool],
    calls: &[ToolCall],
    usage_so_far: &Usage,
    user_context: &Option<Arc<dyn Any + Send + Sync>>,
) -> Vec<ToolResult> {
    // Results are materialized in call order: each future's position in
    // `calls` is its final slot, even though they execute concurrently.
    let futures = calls.iter().map(|call| async move {
        let tool = tools.iter().find(|t| t.name == call.tool_name);
        let Some(tool) = tool else {
            return ToolResult {
                id: call.id.clone(),
                tool_name: call.tool_name.clone(),
                payload: ToolResultPayload::Error {
                    message: format!("no tool registered with name '{}'", call.tool_name),
                },
            };
        };

        if tool.provider_executed {
            return ToolResult {
                id: call.id.clone(),
                tool_name: call.tool_name.clone(),
                payload: ToolResultPayload::Error {
                    message: "provider-executed tool reached local executor".to_string(),
                },
            };
        }

        if tool.strict {
            if let Err(e) = validate_strict(&tool.parameters, &call.arguments) {
                return ToolResult {
                    id: call.id.clone(),
                    tool_name: call.tool_name.clone(),
                    payload: ToolResultPayload::Error { message: e },
                };
            }
        }

        let Some(executor) = &tool.executor else {
            return ToolResult {
                id: call.id.clone(),
                tool_name: call.tool_name.clone(),
                payload: ToolResultPayload::Error {
                    message: format!("tool '{}' has no executor", tool.name),
                },
            };
        };

        let options = ToolCallOptions {
            tool_call_id: call.id.clone(),
            usage_so_far: usage_so_far.clone(),
            user_context: user_context.clone(),
        };

        match executor.execute(call.arguments.clone(), &options).await {
            Ok(payload) => ToolResult {
                id: call.id.clone(),
                tool_name: call.tool_name.clone(),
                payload: ToolResultPayload::Ok { payload },
            },
            Err(e) => ToolResult {
                id: call.id.clone(),
                tool_name: call.tool_name.clone(),
                payload: ToolResultPayload::Error { message: e.to_string() },
            },
        }
    });

    join_all(futures).await
}

fn validate_strict(schema: &serde_json::Value, instance: &serde_json::Value) -> Result<(), String> {
    if !schema.is_object() {
        return Ok(());
    }
    match jsonschema::validator_for(schema) {
        Ok(compiled) => {
            if compiled.validate(instance).is_err() {
                let message = compiled
                    .iter_errors(instance)
                    .take(3)
                    .map(|e| format!("{} at {}", e, e.instance_path))
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(message)
            } else {
                Ok(())
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "invalid tool schema, skipping strict validation");
            Ok(())
        }
    }
}

fn tool_result_messages(results: &[ToolResult]) -> Vec<Message> {
    results
        .iter()
        .map(|r| Message {
            role: Role::Tool,
            content: vec![ContentPart::ToolResult { id: r.id.clone(), result: r.payload.clone() }],
        })
        .collect()
}

/// Run the tool loop (§4.2). Evaluates stop conditions after every step's
/// tool results are appended; exhausting `max_steps` synthesizes a
/// `"length-limit"` finish reason.
pub async fn run(request: ToolLoopRequest) -> Result<ToolLoopResult, LlmError> {
    if !request.tools.is_empty() {
        let caps = request.model.capabilities();
        if !caps.tools {
            return Err(LlmError::ConfigurationError(format!(
                "model '{}' does not support tool-calling but {} tool(s) were supplied",
                request.model.identity().model,
                request.tools.len()
            )));
        }
    }

    let max_steps = if request.max_steps == 0 { DEFAULT_MAX_STEPS } else { request.max_steps };
    let mut history = request.messages;
    let mut steps: Vec<Step> = Vec::new();

    for step_number in 0..max_steps {
        let options = GenerateOptions {
            tools: request.tools.clone(),
            tool_choice: request.tool_choice.clone(),
            ..GenerateOptions::new(history.clone())
        };

        tracing::debug!(step = step_number, "tool loop: dispatching generate");
        let generate_result = request.model.generate(options).await?;
        let assistant_message = assistant_message_from(&generate_result);
        history.push(assistant_message.clone());

        let accumulated_before = Usage::merge_all(steps.iter().map(|s| &s.usage))
            .unwrap_or_default()
            .merge(&generate_result.usage);

        let tool_results = if generate_result.tool_calls.is_empty() {
            Vec::new()
        } else {
            execute_tool_calls(
                &request.tools,
                &generate_result.tool_calls,
                &accumulated_before,
                &request.user_context,
            )
            .await
        };
        history.extend(tool_result_messages(&tool_results));

        let step = Step {
            step_number,
            request_messages: history.clone(),
            assistant_message,
            tool_calls: generate_result.tool_calls.clone(),
            tool_results,
            usage: generate_result.usage.clone(),
            finish_reason: generate_result.finish_reason.clone(),
        };
        steps.push(step);

        if let Some(callback) = &request.on_step_finish {
            let step_ref = steps.last().unwrap();
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(step_ref)))
                .map_err(|_| LlmError::InternalError("on_step_finish callback panicked".to_string()))?;
        }

        let accumulated_usage = Usage::merge_all(steps.iter().map(|s| &s.usage)).unwrap_or_default();
        let latest_step = steps.last().unwrap();
        let ctx = StopContext { steps: &steps, accumulated_usage: &accumulated_usage, latest_step };
        if let Some(reason) = evaluate_stop_conditions(&request.stop_conditions, &ctx)? {
            return finalize(steps, FinishReason::synthesized(reason), request.on_finish.as_deref());
        }

        if latest_step.tool_calls.is_empty() {
            let reason = latest_step.finish_reason.clone();
            return finalize(steps, reason, request.on_finish.as_deref());
        }
    }

    finalize(steps, FinishReason::synthesized("length-limit"), request.on_finish.as_deref())
}

fn finalize(
    steps: Vec<Step>,
    finish_reason: FinishReason,
    on_finish: Option<&(dyn Fn(&GenerateResult, &[Step]) + Send + Sync)>,
) -> Result<ToolLoopResult, LlmError> {
    let text = steps.last().map(|s| s.text()).unwrap_or_default();
    let tool_calls: Vec<ToolCall> = steps.iter().flat_map(|s| s.tool_calls.clone()).collect();
    let usage = Usage::merge_all(steps.iter().map(|s| &s.usage)).unwrap_or_default();

    let result = GenerateResult {
        text,
        tool_calls,
        usage,
        finish_reason,
        raw_request: None,
        raw_response: None,
    };

    if let Some(callback) = on_finish {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(&result, &steps)))
            .map_err(|_| LlmError::InternalError("on_finish callback panicked".to_string()))?;
    }

    Ok(ToolLoopResult { result, steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::test_support::{arc_model, text_result, tool_call_result, ScriptedModel};
    use crate::types::ToolCallOptions;

    fn search_tool() -> Tool {
        Tool::function("search", serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}}))
            .executor(Arc::new(|args: serde_json::Value, _opts: ToolCallOptions| async move {
                let query = args["query"].as_str().unwrap_or_default();
                Ok(serde_json::json!({ "results": format!("results for {query}") }))
            }))
            .build()
    }

    #[tokio::test]
    async fn two_step_search_then_answer() {
        let model = arc_model(ScriptedModel::new(vec![
            tool_call_result(vec![ToolCall {
                id: "call_1".into(),
                tool_name: "search".into(),
                arguments: serde_json::json!({"query": "Go language"}),
            }]),
            text_result("Go is a statically typed, compiled language by Google."),
        ]));

        let mut req = ToolLoopRequest::new(model, vec![Message::user("What is Go?")]);
        req.tools = vec![search_tool()];
        req.stop_conditions = vec![Arc::new(StepCountIs(10))];

        let outcome = run(req).await.unwrap();
        assert_eq!(outcome.result.text, "Go is a statically typed, compiled language by Google.");
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.result.finish_reason, FinishReason::Stop);
        assert_eq!(outcome.steps[0].tool_calls.len(), 1);
        assert_eq!(outcome.steps[0].tool_results.len(), 1);
    }

    #[tokio::test]
    async fn step_count_hard_cap_stops_with_synthesized_reason() {
        let always_calls_tool = tool_call_result(vec![ToolCall {
            id: "call_x".into(),
            tool_name: "search".into(),
            arguments: serde_json::json!({"query": "again"}),
        }]);
        let model = arc_model(ScriptedModel::new(vec![always_calls_tool]));

        let mut req = ToolLoopRequest::new(model, vec![Message::user("Keep calling search forever.")]);
        req.tools = vec![search_tool()];
        req.stop_conditions = vec![Arc::new(StepCountIs(3))];

        let outcome = run(req).await.unwrap();
        assert_eq!(outcome.steps.len(), 3);
        assert_eq!(outcome.result.finish_reason.to_string(), "step-count-is");
    }

    #[tokio::test]
    async fn max_steps_one_still_executes_tools_in_that_step() {
        let model = arc_model(ScriptedModel::new(vec![tool_call_result(vec![ToolCall {
            id: "call_1".into(),
            tool_name: "search".into(),
            arguments: serde_json::json!({"query": "Go"}),
        }])]));

        let mut req = ToolLoopRequest::new(model, vec![Message::user("hi")]);
        req.tools = vec![search_tool()];
        req.max_steps = 1;

        let outcome = run(req).await.unwrap();
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.result.finish_reason, FinishReason::ToolCalls);
        assert_eq!(outcome.steps[0].tool_results.len(), 1);
    }

    #[tokio::test]
    async fn no_tool_calls_finishes_with_provider_reason() {
        let model = arc_model(ScriptedModel::new(vec![text_result("just an answer")]));
        let req = ToolLoopRequest::new(model, vec![Message::user("hi")]);
        let outcome = run(req).await.unwrap();
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.result.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn tools_without_model_support_fail_before_dispatch() {
        struct NoToolsModel;
        #[async_trait::async_trait]
        impl LanguageModel for NoToolsModel {
            fn identity(&self) -> crate::traits::ModelIdentity {
                crate::traits::ModelIdentity {
                    provider: "x".into(),
                    model: "no-tools".into(),
                    spec_version: "1".into(),
                }
            }
            fn capabilities(&self) -> crate::traits::ModelCapabilities {
                crate::traits::ModelCapabilities::default()
            }
            async fn generate(&self, _options: GenerateOptions) -> Result<GenerateResult, LlmError> {
                unreachable!("should fail before dispatch")
            }
            async fn stream(
                &self,
                _options: GenerateOptions,
            ) -> Result<crate::streaming::ChatStreamHandle, LlmError> {
                unreachable!()
            }
        }

        let mut req = ToolLoopRequest::new(Arc::new(NoToolsModel), vec![Message::user("hi")]);
        req.tools = vec![search_tool()];
        let err = run(req).await.unwrap_err();
        assert!(matches!(err, LlmError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn tool_error_does_not_abort_the_loop() {
        let failing_tool = Tool::function("boom", serde_json::json!({"type": "object"}))
            .executor(Arc::new(|_args: serde_json::Value, _opts: ToolCallOptions| async move {
                Err(LlmError::tool_execution("boom", "simulated failure"))
            }))
            .build();

        let model = arc_model(ScriptedModel::new(vec![
            tool_call_result(vec![ToolCall {
                id: "call_1".into(),
                tool_name: "boom".into(),
                arguments: serde_json::json!({}),
            }]),
            text_result("recovered"),
        ]));

        let mut req = ToolLoopRequest::new(model, vec![Message::user("hi")]);
        req.tools = vec![failing_tool];
        let outcome = run(req).await.unwrap();
        assert_eq!(outcome.result.text, "recovered");
        match &outcome.steps[0].tool_results[0].payload {
            ToolResultPayload::Error { .. } => {}
            other => panic!("expected error payload, got {other:?}"),
        }
    }
}
