//! llmrt
//!
//! A provider-agnostic runtime for one-shot and streaming LLM generation,
//! bounded multi-step tool-calling loops, and schema-constrained structured
//! output. See the module docs on [`traits::LanguageModel`],
//! [`orchestrator`], [`streaming`], and [`structured`] for the four pieces
//! that make up the core.
#![deny(unsafe_code)]

pub mod error;
pub mod middleware;
pub mod orchestrator;
pub mod provider;
pub mod retry;
pub mod streaming;
pub mod structured;
pub mod traits;
pub mod types;

pub use error::LlmError;
pub use orchestrator::{ToolLoopRequest, ToolLoopResult};
pub use traits::LanguageModel;
