use async_trait::async_trait;
use futures::StreamExt;

use crate::error::LlmError;
use crate::provider::config::OpenAiCompatConfig;
use crate::provider::wire::{build_request, parse_response};
use crate::streaming::{json_event_stream, make_cancellable_stream, ChatStream, ChatStreamHandle, StreamChunk};
use crate::traits::{LanguageModel, ModelCapabilities, ModelIdentity};
use crate::types::{FinishReason, GenerateOptions, GenerateResult, Usage};

const PROVIDER_NAME: &str = "openai-compatible";
const SPEC_VERSION: &str = "2024-08-01";

/// A chat-capable model reachable through an OpenAI-compatible
/// `/chat/completions` surface.
pub struct OpenAiCompatModel {
    model: String,
    config: OpenAiCompatConfig,
    http: reqwest::Client,
    capabilities: ModelCapabilities,
}

impl OpenAiCompatModel {
    pub fn new(model: impl Into<String>, config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        Self::with_capabilities(
            model,
            config,
            ModelCapabilities { tools: true, structured_output: true, image_input: false },
        )
    }

    pub fn with_capabilities(
        model: impl Into<String>,
        config: OpenAiCompatConfig,
        capabilities: ModelCapabilities,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::ConfigurationError(format!("failed to build http client: {e}")))?;
        Ok(Self { model: model.into(), config, http, capabilities })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.resolve_base_url())
    }

    fn request_builder(&self, body: serde_json::Value) -> Result<reqwest::RequestBuilder, LlmError> {
        let api_key = self.config.resolve_api_key()?;
        let mut builder = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body);
        if let Some(org) = self.config.resolve_organization() {
            builder = builder.header("OpenAI-Organization", org);
        }
        Ok(builder)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatModel {
    fn identity(&self) -> ModelIdentity {
        ModelIdentity {
            provider: PROVIDER_NAME.to_string(),
            model: self.model.clone(),
            spec_version: SPEC_VERSION.to_string(),
        }
    }

    fn capabilities(&self) -> ModelCapabilities {
        self.capabilities
    }

    async fn generate(&self, options: GenerateOptions) -> Result<GenerateResult, LlmError> {
        let retention = options.retention;
        let request = build_request(&self.model, &options, false);
        let request_body = serde_json::to_value(&request)?;

        tracing::debug!(provider = PROVIDER_NAME, model = %self.model, "sending generate request");

        let response = self.request_builder(request_body.clone())?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::provider_http(
                PROVIDER_NAME,
                self.model.clone(),
                Some(status.as_u16()),
                message,
            ));
        }

        let response_body: serde_json::Value = response.json().await?;
        let parsed = parse_response(&response_body)?;

        Ok(GenerateResult {
            text: parsed.text,
            tool_calls: parsed.tool_calls,
            usage: parsed.usage,
            finish_reason: parsed.finish_reason,
            raw_request: retention.request_body.then(|| request_body),
            raw_response: retention.response_body.then(|| response_body),
        })
    }

    async fn stream(&self, options: GenerateOptions) -> Result<ChatStreamHandle, LlmError> {
        let request = build_request(&self.model, &options, true);
        let request_body = serde_json::to_value(&request)?;

        tracing::debug!(provider = PROVIDER_NAME, model = %self.model, "sending stream request");

        let response = self.request_builder(request_body)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::provider_http(
                PROVIDER_NAME,
                self.model.clone(),
                Some(status.as_u16()),
                message,
            ));
        }

        let byte_stream = response.bytes_stream();
        let events = json_event_stream(byte_stream);
        let chunks: ChatStream = Box::pin(decode_stream_events(events));
        let (stream, cancel) = make_cancellable_stream(chunks);
        Ok(ChatStreamHandle { stream, cancel })
    }
}

fn decode_stream_events(
    events: std::pin::Pin<Box<dyn futures::Stream<Item = Result<serde_json::Value, LlmError>> + Send>>,
) -> impl futures::Stream<Item = Result<StreamChunk, LlmError>> + Send {
    async_stream::stream! {
        let mut events = events;
        let mut final_usage: Option<Usage> = None;
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            if let Some(usage) = event.get("usage").and_then(crate::provider::wire::parse_usage) {
                final_usage = Some(usage);
            }

            let Some(choice) = event.get("choices").and_then(|c| c.as_array()).and_then(|c| c.first()) else {
                continue;
            };

            if let Some(delta) = choice.get("delta") {
                if let Some(content) = delta.get("content").and_then(|c| c.as_str()) {
                    if !content.is_empty() {
                        yield Ok(StreamChunk::TextDelta { text: content.to_string() });
                    }
                }
                if let Some(tool_calls) = delta.get("tool_calls").and_then(|t| t.as_array()) {
                    for call in tool_calls {
                        let index = call.get("index").and_then(|i| i.as_u64()).unwrap_or(0) as usize;
                        let id = call.get("id").and_then(|i| i.as_str()).map(str::to_string);
                        let function = call.get("function");
                        let name = function
                            .and_then(|f| f.get("name"))
                            .and_then(|n| n.as_str())
                            .map(str::to_string);
                        let arguments_fragment = function
                            .and_then(|f| f.get("arguments"))
                            .and_then(|a| a.as_str())
                            .unwrap_or("")
                            .to_string();
                        yield Ok(StreamChunk::ToolCallDelta { index, id, name, arguments_fragment });
                    }
                }
            }

            if let Some(reason) = choice.get("finish_reason").and_then(|r| r.as_str()) {
                yield Ok(StreamChunk::Finish {
                    finish_reason: FinishReason::from_provider_str(reason),
                    usage: final_usage.clone(),
                });
            }
        }
    }
}
