//! The streaming pipeline (§4.3): SSE transport → typed chunks → consumer
//! stream, plus the element-wise array extractor built on top of it (§4.4).

mod aggregate;
mod cancel;
mod element_stream;
pub(crate) mod json_repair;
mod sse;
mod tool_call_assembler;
mod types;

pub use aggregate::aggregate_stream;
pub use cancel::{make_cancellable_stream, new_cancel_handle, CancelHandle};
pub use element_stream::{element_stream, Element};
pub use sse::{json_event_stream, DONE_SENTINEL};
pub use tool_call_assembler::ToolCallAssembler;
pub use types::{ChatStream, ChatStreamHandle, StreamChunk};
