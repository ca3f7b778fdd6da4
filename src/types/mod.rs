//! Core data model: messages, tools, usage, and the request/response shapes
//! that flow between the orchestrator and a provider.

mod finish_reason;
mod message;
mod prompt;
mod request;
mod response;
mod schema;
mod step;
mod tools;
mod usage;

pub use finish_reason::FinishReason;
pub use message::{ContentPart, ImageSource, Message, Role, ToolResultPayload};
pub use prompt::Prompt;
pub use request::{GenerateOptions, Retention, ResponseFormat, SamplingParams};
pub use response::GenerateResult;
pub use schema::{OutputSchema, StructuredOutputMode};
pub use step::Step;
pub use tools::{Tool, ToolBuilder, ToolCall, ToolCallOptions, ToolChoice, ToolExecutor, ToolResult};
pub use usage::{InputDetails, OutputDetails, Usage};
