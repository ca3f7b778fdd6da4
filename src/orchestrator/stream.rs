//! Streaming variant of the tool loop: the caller drives a live [`ChatStream`]
//! across however many steps the loop takes, and reads the finalized step
//! log once the stream has been fully drained.

use futures::StreamExt;
use tokio::sync::oneshot;

use crate::error::LlmError;
use crate::streaming::{new_cancel_handle, CancelHandle, ChatStream, StreamChunk, ToolCallAssembler};
use crate::types::{FinishReason, GenerateOptions, Step, ToolCall, Usage};

use super::{assistant_message_from, execute_tool_calls, tool_result_messages, ToolLoopRequest, StopContext};
use super::stop_condition::evaluate_stop_conditions;

const DEFAULT_MAX_STEPS: usize = 8;

/// A streaming tool-loop handle. `stream` yields chunks from every step in
/// sequence; once it's drained, `steps` resolves with the finalized log.
pub struct ToolLoopStreamHandle {
    pub stream: ChatStream,
    pub steps: oneshot::Receiver<Vec<Step>>,
    pub cancel: CancelHandle,
}

/// Run the tool loop, forwarding each step's provider chunks to the consumer
/// live instead of buffering a whole step before exposing it.
pub async fn stream_run(request: ToolLoopRequest) -> Result<ToolLoopStreamHandle, LlmError> {
    if !request.tools.is_empty() && !request.model.capabilities().tools {
        return Err(LlmError::ConfigurationError(format!(
            "model '{}' does not support tool-calling but {} tool(s) were supplied",
            request.model.identity().model,
            request.tools.len()
        )));
    }

    let (steps_tx, steps_rx) = oneshot::channel();
    let cancel = new_cancel_handle();
    let cancel_for_task = cancel.clone();

    let max_steps = if request.max_steps == 0 { DEFAULT_MAX_STEPS } else { request.max_steps };

    let out = async_stream::stream! {
        let mut history = request.messages.clone();
        let mut steps: Vec<Step> = Vec::new();

        for step_number in 0..max_steps {
            let options = GenerateOptions {
                tools: request.tools.clone(),
                tool_choice: request.tool_choice.clone(),
                ..GenerateOptions::new(history.clone())
            };

            let handle = match request.model.stream(options).await {
                Ok(h) => h,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let mut inner = handle.stream;

            let mut text = String::new();
            let mut tool_calls: Vec<ToolCall> = Vec::new();
            let mut assembler = ToolCallAssembler::new();
            let mut step_usage = Usage::default();
            let mut finish_reason = None;

            loop {
                tokio::select! {
                    _ = cancel_for_task.cancelled() => {
                        yield Err(LlmError::CancellationError);
                        return;
                    }
                    item = inner.next() => {
                        let Some(item) = item else { break };
                        match item {
                            Ok(chunk) => {
                                match &chunk {
                                    StreamChunk::TextDelta { text: delta } => text.push_str(delta),
                                    StreamChunk::ToolCallDelta { index, id, name, arguments_fragment } => {
                                        if let Some(call) = assembler.push_delta(*index, id.clone(), name.clone(), arguments_fragment) {
                                            tool_calls.push(call);
                                        }
                                    }
                                    StreamChunk::ToolCall { id, name, arguments } => {
                                        tool_calls.push(ToolCall {
                                            id: id.clone(),
                                            tool_name: name.clone(),
                                            arguments: arguments.clone(),
                                        });
                                    }
                                    StreamChunk::UsageUpdate { usage } => step_usage = usage.clone(),
                                    StreamChunk::Finish { finish_reason: reason, usage } => {
                                        finish_reason = Some(reason.clone());
                                        if let Some(usage) = usage {
                                            step_usage = usage.clone();
                                        }
                                    }
                                }
                                yield Ok(chunk);
                            }
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }
                }
            }
            tool_calls.extend(assembler.finalize());

            let assistant_message = assistant_message_from(&crate::types::GenerateResult {
                text: text.clone(),
                tool_calls: tool_calls.clone(),
                usage: step_usage.clone(),
                finish_reason: finish_reason.clone().unwrap_or(FinishReason::Stop),
                raw_request: None,
                raw_response: None,
            });
            history.push(assistant_message.clone());

            let accumulated_before = Usage::merge_all(steps.iter().map(|s| &s.usage))
                .unwrap_or_default()
                .merge(&step_usage);

            let tool_results = if tool_calls.is_empty() {
                Vec::new()
            } else {
                execute_tool_calls(&request.tools, &tool_calls, &accumulated_before, &request.user_context).await
            };
            history.extend(tool_result_messages(&tool_results));

            let step = Step {
                step_number,
                request_messages: history.clone(),
                assistant_message,
                tool_calls,
                tool_results,
                usage: step_usage,
                finish_reason: finish_reason.unwrap_or(FinishReason::Stop),
            };
            steps.push(step);

            if let Some(callback) = &request.on_step_finish {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(steps.last().unwrap())));
            }

            let accumulated_usage = Usage::merge_all(steps.iter().map(|s| &s.usage)).unwrap_or_default();
            let latest_step = steps.last().unwrap();
            let ctx = StopContext { steps: &steps, accumulated_usage: &accumulated_usage, latest_step };
            match evaluate_stop_conditions(&request.stop_conditions, &ctx) {
                Ok(Some(_reason)) => break,
                Ok(None) => {
                    if latest_step.tool_calls.is_empty() {
                        break;
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        let _ = steps_tx.send(steps);
    };

    Ok(ToolLoopStreamHandle { stream: Box::pin(out), steps: steps_rx, cancel })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::traits::test_support::{arc_model, text_result, tool_call_result, ScriptedModel};
    use crate::types::{Message, ToolCallOptions};

    fn search_tool() -> crate::types::Tool {
        crate::types::Tool::function(
            "search",
            serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        )
        .executor(Arc::new(|args: serde_json::Value, _opts: ToolCallOptions| async move {
            let query = args["query"].as_str().unwrap_or_default();
            Ok(serde_json::json!({ "results": format!("results for {query}") }))
        }))
        .build()
    }

    #[tokio::test]
    async fn streams_chunks_across_two_steps_and_resolves_step_log() {
        let model = arc_model(ScriptedModel::new(vec![
            tool_call_result(vec![ToolCall {
                id: "call_1".into(),
                tool_name: "search".into(),
                arguments: serde_json::json!({"query": "Go"}),
            }]),
            text_result("Go is a language."),
        ]));

        let mut req = ToolLoopRequest::new(model, vec![Message::user("What is Go?")]);
        req.tools = vec![search_tool()];

        let mut handle = stream_run(req).await.unwrap();
        let mut chunk_count = 0;
        while handle.stream.next().await.is_some() {
            chunk_count += 1;
        }
        assert!(chunk_count >= 2);

        let steps = handle.steps.await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].text(), "Go is a language.");
    }

    #[tokio::test]
    async fn cancellation_surfaces_as_terminal_error() {
        let model = arc_model(ScriptedModel::new(vec![text_result("slow answer")]));
        let req = ToolLoopRequest::new(model, vec![Message::user("hi")]);
        let mut handle = stream_run(req).await.unwrap();
        handle.cancel.cancel();
        // Either a cancellation error or a clean completion is acceptable
        // depending on scheduling, but no panic/hang is.
        let _ = tokio::time::timeout(std::time::Duration::from_millis(500), async {
            while handle.stream.next().await.is_some() {}
        })
        .await
        .expect("stream must terminate promptly after cancellation");
    }
}
