//! The tool-loop's append-only step log.

use serde::{Deserialize, Serialize};

use super::finish_reason::FinishReason;
use super::message::Message;
use super::tools::{ToolCall, ToolResult};
use super::usage::Usage;

/// One provider round-trip within a tool loop, including any tool executions
/// it triggered. Steps form an ordered, append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step_number: usize,
    /// The outgoing messages this step was generated against.
    pub request_messages: Vec<Message>,
    /// The assistant message synthesized from the provider's response.
    pub assistant_message: Message,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub usage: Usage,
    pub finish_reason: FinishReason,
}

impl Step {
    /// Text content of the assistant message for this step.
    pub fn text(&self) -> String {
        self.assistant_message.text()
    }
}
