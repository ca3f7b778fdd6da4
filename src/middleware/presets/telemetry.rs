//! Logging/telemetry wrapper built on `tracing` spans (§10.1).

use async_trait::async_trait;

use crate::error::LlmError;
use crate::middleware::LanguageModelMiddleware;
use crate::streaming::ChatStreamHandle;
use crate::traits::LanguageModel;
use crate::types::{GenerateOptions, GenerateResult};

/// Wraps a call with a `tracing` span carrying `provider`/`model`, and logs
/// its outcome at `debug!` (success) or `warn!` (failure).
#[derive(Debug, Default)]
pub struct TelemetryMiddleware;

impl TelemetryMiddleware {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageModelMiddleware for TelemetryMiddleware {
    async fn wrap_generate(
        &self,
        next: &(dyn LanguageModel + Send + Sync),
        options: GenerateOptions,
    ) -> Result<GenerateResult, LlmError> {
        let identity = next.identity();
        let span = tracing::debug_span!("generate", provider = %identity.provider, model = %identity.model);
        let _enter = span.enter();

        match next.generate(options).await {
            Ok(result) => {
                tracing::debug!(
                    provider = %identity.provider,
                    model = %identity.model,
                    finish_reason = %result.finish_reason,
                    "generate completed"
                );
                Ok(result)
            }
            Err(error) => {
                tracing::warn!(
                    provider = %identity.provider,
                    model = %identity.model,
                    error = %error,
                    "generate failed"
                );
                Err(error)
            }
        }
    }

    async fn wrap_stream(
        &self,
        next: &(dyn LanguageModel + Send + Sync),
        options: GenerateOptions,
    ) -> Result<ChatStreamHandle, LlmError> {
        let identity = next.identity();
        tracing::debug!(provider = %identity.provider, model = %identity.model, "stream started");
        next.stream(options).await.inspect_err(|error| {
            tracing::warn!(provider = %identity.provider, model = %identity.model, error = %error, "stream failed to start");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_test::{logs_contain, traced_test};

    use crate::traits::test_support::{arc_model, text_result, ScriptedModel};
    use crate::types::Message;

    #[tokio::test]
    #[traced_test]
    async fn logs_a_debug_event_on_success() {
        let model: Arc<dyn LanguageModel> = arc_model(ScriptedModel::new(vec![text_result("hi")]));
        let mw = TelemetryMiddleware::new();
        let result = mw.wrap_generate(model.as_ref(), GenerateOptions::new(vec![Message::user("hi")])).await;
        assert!(result.is_ok());
        assert!(logs_contain("generate completed"));
    }
}
