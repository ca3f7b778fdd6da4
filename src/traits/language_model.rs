//! The provider contract (§4.1).

use async_trait::async_trait;

use crate::error::LlmError;
use crate::streaming::ChatStreamHandle;
use crate::types::{GenerateOptions, GenerateResult};

/// Provider name + model id + a specification-version string, used for
/// compatibility gating by callers that branch on provider quirks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIdentity {
    pub provider: String,
    pub model: String,
    pub spec_version: String,
}

/// Boolean capability flags a provider/model combination supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub tools: bool,
    pub structured_output: bool,
    pub image_input: bool,
}

/// A chat-capable language model. This is the one capability the core
/// implements end-to-end; embedding/image/speech/transcription/reranking
/// factories are out of scope.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn identity(&self) -> ModelIdentity;

    fn capabilities(&self) -> ModelCapabilities;

    /// One-shot generation.
    async fn generate(&self, options: GenerateOptions) -> Result<GenerateResult, LlmError>;

    /// Streaming generation. Returns a handle wrapping a lazy, forward-only,
    /// single-consumer chunk stream plus its cancel token.
    async fn stream(&self, options: GenerateOptions) -> Result<ChatStreamHandle, LlmError>;
}
