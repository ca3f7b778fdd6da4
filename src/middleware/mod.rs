//! Language-model middleware (§4.6): optional hooks composed around a
//! [`LanguageModel`] in declared order, the first in the list wrapping the
//! outermost call.

mod presets;
mod stack;

pub use presets::{DefaultSettingsMiddleware, SimulateStreamingMiddleware, TelemetryMiddleware};
pub use stack::MiddlewareStack;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::streaming::ChatStreamHandle;
use crate::traits::LanguageModel;
use crate::types::{GenerateOptions, GenerateResult};

/// A middleware hooking into parameter transformation and/or the
/// generate/stream call itself.
///
/// Every method has a pass-through default, so implementations only override
/// the hooks they need. `wrap_generate`/`wrap_stream` receive `next` — the
/// rest of the chain, itself a [`LanguageModel`] — and MUST call through to
/// it (directly or indirectly) unless deliberately short-circuiting; doing
/// otherwise breaks cancellation propagation and silently drops errors.
#[async_trait]
pub trait LanguageModelMiddleware: Send + Sync {
    /// Transform request options before they reach the next layer.
    fn transform_params(&self, options: GenerateOptions) -> GenerateOptions {
        options
    }

    async fn wrap_generate(
        &self,
        next: &(dyn LanguageModel + Send + Sync),
        options: GenerateOptions,
    ) -> Result<GenerateResult, LlmError> {
        next.generate(options).await
    }

    async fn wrap_stream(
        &self,
        next: &(dyn LanguageModel + Send + Sync),
        options: GenerateOptions,
    ) -> Result<ChatStreamHandle, LlmError> {
        next.stream(options).await
    }
}
