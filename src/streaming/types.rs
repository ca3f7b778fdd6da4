//! Chunk and stream-handle types for the streaming pipeline (§4.3).

use std::pin::Pin;

use futures::Stream;

use crate::error::LlmError;
use crate::types::{FinishReason, Usage};

use super::cancel::CancelHandle;

/// One unit emitted by a streaming generation.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    TextDelta {
        text: String,
    },
    /// A tool call fragment. `arguments_fragment` accretes across multiple
    /// chunks sharing the same `index`; see
    /// [`super::tool_call_assembler::ToolCallAssembler`].
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_fragment: String,
    },
    /// A fully-formed tool call, either because the provider sent it whole or
    /// because the assembler just promoted a completed accumulation.
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    UsageUpdate {
        usage: Usage,
    },
    Finish {
        finish_reason: FinishReason,
        usage: Option<Usage>,
    },
}

/// A lazy, forward-only, single-consumer sequence of [`StreamChunk`]s.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

/// A streaming generation handle: the chunk stream plus the token that
/// cancels it.
pub struct ChatStreamHandle {
    pub stream: ChatStream,
    pub cancel: CancelHandle,
}
