//! Turns a non-streaming model into a streaming one by running `generate`
//! and emitting its result as a single terminal chunk.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::middleware::LanguageModelMiddleware;
use crate::streaming::{make_cancellable_stream, ChatStream, ChatStreamHandle, StreamChunk};
use crate::traits::LanguageModel;
use crate::types::GenerateOptions;

#[derive(Debug, Default)]
pub struct SimulateStreamingMiddleware;

impl SimulateStreamingMiddleware {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageModelMiddleware for SimulateStreamingMiddleware {
    async fn wrap_stream(
        &self,
        next: &(dyn LanguageModel + Send + Sync),
        options: GenerateOptions,
    ) -> Result<ChatStreamHandle, LlmError> {
        let result = next.generate(options).await?;

        let mut chunks = Vec::with_capacity(result.tool_calls.len() + 2);
        if !result.text.is_empty() {
            chunks.push(Ok(StreamChunk::TextDelta { text: result.text.clone() }));
        }
        for call in &result.tool_calls {
            chunks.push(Ok(StreamChunk::ToolCall {
                id: call.id.clone(),
                name: call.tool_name.clone(),
                arguments: call.arguments.clone(),
            }));
        }
        chunks.push(Ok(StreamChunk::Finish {
            finish_reason: result.finish_reason,
            usage: Some(result.usage),
        }));

        let stream: ChatStream = Box::pin(futures::stream::iter(chunks));
        let (stream, cancel) = make_cancellable_stream(stream);
        Ok(ChatStreamHandle { stream, cancel })
    }
}
