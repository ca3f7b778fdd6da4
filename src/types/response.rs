//! The one-shot generation result.

use super::finish_reason::FinishReason;
use super::tools::ToolCall;
use super::usage::Usage;

/// Result of a single `generate` call (one provider round-trip).
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub finish_reason: FinishReason,
    /// Present only when [`super::request::Retention::request_body`] is set.
    pub raw_request: Option<serde_json::Value>,
    /// Present only when [`super::request::Retention::response_body`] is set.
    pub raw_response: Option<serde_json::Value>,
}
