//! OpenAI-compatible `/chat/completions` wire shapes (§6) and usage
//! normalization.

use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, GenerateOptions, Message, Role, ToolCall, ToolChoice, Usage};

#[derive(Debug, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize)]
pub struct WireToolCall {
    pub id: String,
    pub r#type: &'static str,
    pub function: WireToolCallFunction,
}

#[derive(Debug, Serialize)]
pub struct WireToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub struct WireFunctionDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct WireTool {
    pub r#type: &'static str,
    pub function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WireToolChoice {
    Mode(&'static str),
    Named { r#type: &'static str, function: WireToolChoiceFunction },
}

#[derive(Debug, Serialize)]
pub struct WireToolChoiceFunction {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct WireJsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum WireResponseFormat {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "json_object")]
    JsonObject,
    #[serde(rename = "json_schema")]
    JsonSchema { json_schema: WireJsonSchema },
}

#[derive(Debug, Serialize)]
pub struct WireRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<WireToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<WireResponseFormat>,
    pub stream: bool,
    #[serde(flatten)]
    pub provider_options: serde_json::Map<String, serde_json::Value>,
}

/// Model-id prefixes that reject `response_format` on this surface (§9 open
/// question): the adapter strips the hint for these rather than failing the
/// request, leaving schema validation to run post-hoc on the decoded text.
const RESPONSE_FORMAT_EXEMPT_PREFIXES: &[&str] = &["o1-mini", "o1-preview"];

pub fn model_accepts_response_format(model: &str) -> bool {
    !RESPONSE_FORMAT_EXEMPT_PREFIXES.iter().any(|prefix| model.starts_with(prefix))
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        let text = message.text();
        let tool_calls: Vec<WireToolCall> = message
            .tool_calls()
            .into_iter()
            .map(|(id, name, arguments)| WireToolCall {
                id: id.to_string(),
                r#type: "function",
                function: WireToolCallFunction {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            })
            .collect();

        let tool_result = message.content.iter().find_map(|part| match part {
            crate::types::ContentPart::ToolResult { id, result } => Some((id.clone(), result)),
            _ => None,
        });

        if let Some((id, result)) = tool_result {
            let content = match result {
                crate::types::ToolResultPayload::Ok { payload } => payload.to_string(),
                crate::types::ToolResultPayload::Error { message } => {
                    serde_json::json!({ "error": message }).to_string()
                }
            };
            out.push(WireMessage {
                role: "tool",
                content: Some(content),
                tool_call_id: Some(id),
                tool_calls: None,
            });
            continue;
        }

        out.push(WireMessage {
            role: wire_role(message.role),
            content: if text.is_empty() && !tool_calls.is_empty() { None } else { Some(text) },
            tool_call_id: None,
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        });
    }
    out
}

fn to_wire_tool_choice(choice: &ToolChoice) -> Option<WireToolChoice> {
    match choice {
        ToolChoice::Auto => Some(WireToolChoice::Mode("auto")),
        ToolChoice::Required => Some(WireToolChoice::Mode("required")),
        ToolChoice::None => Some(WireToolChoice::Mode("none")),
        ToolChoice::Tool { name } => Some(WireToolChoice::Named {
            r#type: "function",
            function: WireToolChoiceFunction { name: name.clone() },
        }),
    }
}

/// Build the request body for `model`, honoring `options` and the
/// provider-options bag keyed `"openai"` for pass-through fields.
pub fn build_request(model: &str, options: &GenerateOptions, stream: bool) -> WireRequest {
    let response_format = if model_accepts_response_format(model) {
        match &options.response_format {
            crate::types::ResponseFormat::Text => None,
            crate::types::ResponseFormat::Json => Some(WireResponseFormat::JsonObject),
            crate::types::ResponseFormat::JsonSchema(schema) => {
                Some(WireResponseFormat::JsonSchema {
                    json_schema: WireJsonSchema {
                        name: schema.name.clone().unwrap_or_else(|| "output".to_string()),
                        schema: schema.schema.clone(),
                        strict: true,
                    },
                })
            }
        }
    } else {
        None
    };

    let provider_options = options
        .provider_options
        .get("openai")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    WireRequest {
        model: model.to_string(),
        messages: to_wire_messages(&options.messages),
        temperature: options.sampling.temperature,
        top_p: options.sampling.top_p,
        max_tokens: options.sampling.max_tokens,
        frequency_penalty: options.sampling.frequency_penalty,
        presence_penalty: options.sampling.presence_penalty,
        stop: options.sampling.stop_sequences.clone(),
        seed: options.sampling.seed,
        tools: options
            .tools
            .iter()
            .map(|tool| WireTool {
                r#type: "function",
                function: WireFunctionDef {
                    name: tool.name.clone(),
                    description: if tool.description.is_empty() {
                        None
                    } else {
                        Some(tool.description.clone())
                    },
                    parameters: tool.parameters.clone(),
                },
            })
            .collect(),
        tool_choice: if options.tools.is_empty() { None } else { to_wire_tool_choice(&options.tool_choice) },
        response_format,
        stream,
        provider_options,
    }
}

#[derive(Debug, Deserialize)]
struct CompatFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompatToolCall {
    id: String,
    function: CompatFunction,
}

#[derive(Debug, Default, Deserialize)]
struct CompatMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<CompatToolCall>,
}

#[derive(Debug, Deserialize)]
struct CompatChoice {
    message: CompatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompatPromptTokensDetails {
    cached_tokens: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompatCompletionTokensDetails {
    reasoning_tokens: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
    reasoning_tokens: Option<u64>,
    #[serde(default)]
    prompt_tokens_details: CompatPromptTokensDetails,
    #[serde(default)]
    completion_tokens_details: CompatCompletionTokensDetails,
}

#[derive(Debug, Deserialize)]
struct CompatResponse {
    choices: Vec<CompatChoice>,
    #[serde(default)]
    usage: Option<CompatUsage>,
}

/// Parse and normalize a top-level `usage` object from either a non-streaming
/// response body or a streaming chunk's terminal event.
pub fn parse_usage(value: &serde_json::Value) -> Option<Usage> {
    serde_json::from_value::<CompatUsage>(value.clone()).ok().map(normalize_usage)
}

/// Normalize a `/chat/completions` usage block (§6 "Usage normalization"),
/// including the fix for providers that report `reasoning_tokens` larger than
/// `completion_tokens`: rather than letting `textTokens` go negative, the
/// reasoning count is added into completion (and the total corrected by the
/// same amount) so `textTokens` stays `completion_tokens`.
fn normalize_usage(raw: CompatUsage) -> Usage {
    let reasoning_tokens = raw
        .completion_tokens_details
        .reasoning_tokens
        .or(raw.reasoning_tokens);

    let mut completion_tokens = raw.completion_tokens;
    let mut total_tokens = raw.total_tokens;

    if let (Some(reasoning), Some(completion)) = (reasoning_tokens, completion_tokens) {
        if reasoning > completion {
            if let Some(total) = total_tokens {
                total_tokens = Some(total + reasoning);
            }
            completion_tokens = Some(completion + reasoning);
        }
    }

    let cache_read_tokens = raw.prompt_tokens_details.cached_tokens;
    let no_cache_tokens = match (raw.prompt_tokens, cache_read_tokens) {
        (Some(input), Some(cached)) if cached > 0 => Some(input.saturating_sub(cached)),
        _ => None,
    };
    let text_tokens = match (completion_tokens, reasoning_tokens) {
        (Some(output), Some(reasoning)) if reasoning > 0 => Some(output.saturating_sub(reasoning)),
        _ => None,
    };

    Usage {
        input_tokens: raw.prompt_tokens,
        output_tokens: completion_tokens,
        total_tokens,
        input_details: crate::types::InputDetails {
            no_cache_tokens,
            cache_read_tokens,
            cache_write_tokens: None,
        },
        output_details: crate::types::OutputDetails { text_tokens, reasoning_tokens },
        raw: Default::default(),
    }
}

/// Parsed shape of a non-streaming `/chat/completions` response, ready to be
/// folded into a [`crate::types::GenerateResult`] by the caller (which also
/// attaches raw request/response per [`crate::types::Retention`]).
pub struct ParsedResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub finish_reason: FinishReason,
}

pub fn parse_response(body: &serde_json::Value) -> Result<ParsedResponse, crate::error::LlmError> {
    let resp: CompatResponse = serde_json::from_value(body.clone())?;
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| crate::error::LlmError::ProtocolError("response had no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| serde_json::Value::String(call.function.arguments.clone()));
            ToolCall { id: call.id, tool_name: call.function.name, arguments }
        })
        .collect();

    let finish_reason = choice
        .finish_reason
        .map(|r| FinishReason::from_provider_str(&r))
        .unwrap_or(FinishReason::Stop);

    let usage = resp.usage.map(normalize_usage).unwrap_or_default();

    Ok(ParsedResponse {
        text: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage,
        finish_reason,
    })
}
