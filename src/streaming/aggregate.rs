//! Materializing a one-shot-shaped [`GenerateResult`] from a drained chunk stream.

use futures::StreamExt;

use crate::error::LlmError;
use crate::types::{FinishReason, GenerateResult, Usage};

use super::tool_call_assembler::ToolCallAssembler;
use super::types::{ChatStream, StreamChunk};

/// Drive `stream` to completion, reassembling partial tool calls and
/// concatenating text deltas, and produce the same result shape `generate`
/// would have returned for an equivalent non-streaming call.
///
/// Per §8's round-trip property, simulating streaming over a non-streaming
/// provider and then calling this must be structurally equal (modulo
/// streaming-specific fields) to calling `generate` directly.
pub async fn aggregate_stream(mut stream: ChatStream) -> Result<GenerateResult, LlmError> {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut assembler = ToolCallAssembler::new();
    let mut usage = Usage::default();
    let mut finish_reason = None;

    while let Some(item) = stream.next().await {
        match item? {
            StreamChunk::TextDelta { text: delta } => text.push_str(&delta),
            StreamChunk::ToolCallDelta { index, id, name, arguments_fragment } => {
                if let Some(call) = assembler.push_delta(index, id, name, &arguments_fragment) {
                    tool_calls.push(call);
                }
            }
            StreamChunk::ToolCall { id, name, arguments } => {
                tool_calls.push(crate::types::ToolCall { id, tool_name: name, arguments });
            }
            StreamChunk::UsageUpdate { usage: update } => usage = update,
            StreamChunk::Finish { finish_reason: reason, usage: final_usage } => {
                finish_reason = Some(reason);
                if let Some(final_usage) = final_usage {
                    usage = final_usage;
                }
            }
        }
    }

    tool_calls.extend(assembler.finalize());

    Ok(GenerateResult {
        text,
        tool_calls,
        usage,
        finish_reason: finish_reason.unwrap_or(FinishReason::Stop),
        raw_request: None,
        raw_response: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concatenates_text_and_keeps_last_usage() {
        let chunks: Vec<Result<StreamChunk, LlmError>> = vec![
            Ok(StreamChunk::TextDelta { text: "Hello, ".into() }),
            Ok(StreamChunk::TextDelta { text: "world.".into() }),
            Ok(StreamChunk::Finish {
                finish_reason: FinishReason::Stop,
                usage: Some(Usage { total_tokens: Some(42), ..Default::default() }),
            }),
        ];
        let stream: ChatStream = Box::pin(futures::stream::iter(chunks));
        let result = aggregate_stream(stream).await.unwrap();
        assert_eq!(result.text, "Hello, world.");
        assert_eq!(result.usage.total_tokens, Some(42));
        assert_eq!(result.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn reassembles_partial_tool_call_deltas() {
        let chunks: Vec<Result<StreamChunk, LlmError>> = vec![
            Ok(StreamChunk::ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("search".into()),
                arguments_fragment: "{\"q\":".into(),
            }),
            Ok(StreamChunk::ToolCallDelta {
                index: 0,
                id: None,
                name: None,
                arguments_fragment: "\"go\"}".into(),
            }),
            Ok(StreamChunk::Finish { finish_reason: FinishReason::ToolCalls, usage: None }),
        ];
        let stream: ChatStream = Box::pin(futures::stream::iter(chunks));
        let result = aggregate_stream(stream).await.unwrap();
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].arguments["q"], "go");
    }

    #[tokio::test]
    async fn mid_stream_error_propagates() {
        let chunks: Vec<Result<StreamChunk, LlmError>> = vec![
            Ok(StreamChunk::TextDelta { text: "partial".into() }),
            Err(LlmError::ProtocolError("boom".into())),
        ];
        let stream: ChatStream = Box::pin(futures::stream::iter(chunks));
        let err = aggregate_stream(stream).await.unwrap_err();
        assert!(matches!(err, LlmError::ProtocolError(_)));
    }
}
