//! Composition of a middleware chain around a base [`LanguageModel`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::LanguageModelMiddleware;
use crate::error::LlmError;
use crate::streaming::ChatStreamHandle;
use crate::traits::{LanguageModel, ModelCapabilities, ModelIdentity};
use crate::types::{GenerateOptions, GenerateResult};

/// A [`LanguageModel`] wrapping `inner` with an ordered list of middlewares.
/// The first middleware in the list wraps the outermost call; the last wraps
/// just `inner`.
pub struct MiddlewareStack {
    middlewares: Vec<Arc<dyn LanguageModelMiddleware>>,
    inner: Arc<dyn LanguageModel>,
}

impl MiddlewareStack {
    pub fn new(inner: Arc<dyn LanguageModel>, middlewares: Vec<Arc<dyn LanguageModelMiddleware>>) -> Self {
        Self { middlewares, inner }
    }
}

/// The remaining suffix of a middleware chain, exposed as a [`LanguageModel`]
/// so a middleware's `next` parameter can simply be called like any model.
struct ChainTail<'a> {
    middlewares: &'a [Arc<dyn LanguageModelMiddleware>],
    base: &'a (dyn LanguageModel + Send + Sync),
}

#[async_trait]
impl<'a> LanguageModel for ChainTail<'a> {
    fn identity(&self) -> ModelIdentity {
        self.base.identity()
    }

    fn capabilities(&self) -> ModelCapabilities {
        self.base.capabilities()
    }

    async fn generate(&self, options: GenerateOptions) -> Result<GenerateResult, LlmError> {
        run_generate(self.middlewares, self.base, options).await
    }

    async fn stream(&self, options: GenerateOptions) -> Result<ChatStreamHandle, LlmError> {
        run_stream(self.middlewares, self.base, options).await
    }
}

fn run_generate<'a>(
    middlewares: &'a [Arc<dyn LanguageModelMiddleware>],
    base: &'a (dyn LanguageModel + Send + Sync),
    options: GenerateOptions,
) -> BoxFuture<'a, Result<GenerateResult, LlmError>> {
    Box::pin(async move {
        match middlewares.split_first() {
            None => base.generate(options).await,
            Some((first, rest)) => {
                let tail = ChainTail { middlewares: rest, base };
                first.wrap_generate(&tail, options).await
            }
        }
    })
}

fn run_stream<'a>(
    middlewares: &'a [Arc<dyn LanguageModelMiddleware>],
    base: &'a (dyn LanguageModel + Send + Sync),
    options: GenerateOptions,
) -> BoxFuture<'a, Result<ChatStreamHandle, LlmError>> {
    Box::pin(async move {
        match middlewares.split_first() {
            None => base.stream(options).await,
            Some((first, rest)) => {
                let tail = ChainTail { middlewares: rest, base };
                first.wrap_stream(&tail, options).await
            }
        }
    })
}

#[async_trait]
impl LanguageModel for MiddlewareStack {
    fn identity(&self) -> ModelIdentity {
        self.inner.identity()
    }

    fn capabilities(&self) -> ModelCapabilities {
        self.inner.capabilities()
    }

    async fn generate(&self, options: GenerateOptions) -> Result<GenerateResult, LlmError> {
        let options = self.middlewares.iter().fold(options, |opts, mw| mw.transform_params(opts));
        run_generate(&self.middlewares, self.inner.as_ref(), options).await
    }

    async fn stream(&self, options: GenerateOptions) -> Result<ChatStreamHandle, LlmError> {
        let options = self.middlewares.iter().fold(options, |opts, mw| mw.transform_params(opts));
        run_stream(&self.middlewares, self.inner.as_ref(), options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::test_support::{arc_model, text_result, ScriptedModel};
    use crate::types::Message;

    struct RenameModel(&'static str);

    #[async_trait]
    impl LanguageModelMiddleware for RenameModel {
        fn transform_params(&self, options: GenerateOptions) -> GenerateOptions {
            let mut options = options;
            options
                .provider_options
                .insert("openai".to_string(), serde_json::json!({ "renamed_to": self.0 }));
            options
        }
    }

    #[tokio::test]
    async fn transform_params_applies_in_list_order() {
        let inner = arc_model(ScriptedModel::new(vec![text_result("hi")]));
        let stack = MiddlewareStack::new(
            inner,
            vec![Arc::new(RenameModel("first")), Arc::new(RenameModel("second"))],
        );
        let result = stack.generate(GenerateOptions::new(vec![Message::user("hi")])).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn empty_chain_forwards_directly_to_inner() {
        let inner = arc_model(ScriptedModel::new(vec![text_result("direct")]));
        let stack = MiddlewareStack::new(inner, vec![]);
        let result = stack.generate(GenerateOptions::new(vec![Message::user("hi")])).await.unwrap();
        assert_eq!(result.text, "direct");
    }
}
