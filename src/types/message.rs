//! Messages and content parts.

use serde::{Deserialize, Serialize};

/// The role a [`Message`] was authored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One piece of a message's content.
///
/// Messages carry an ordered sequence of parts rather than a single string so
/// that multi-modal input and tool-call/tool-result content can live
/// alongside plain text within one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text { text: String },
    Image { source: ImageSource, mime_type: Option<String> },
    File { source: ImageSource, mime_type: Option<String>, filename: Option<String> },
    ToolCall { id: String, name: String, arguments: serde_json::Value },
    ToolResult { id: String, result: ToolResultPayload },
}

/// Where image/file bytes for a [`ContentPart::Image`] or [`ContentPart::File`] come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ImageSource {
    Url { url: String },
    Bytes {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
}

/// The outcome of a tool execution, carried inside a [`ContentPart::ToolResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResultPayload {
    Ok { payload: serde_json::Value },
    Error { message: String },
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

/// A single message in a conversation. Immutable once appended to a step log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn assistant(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn tool_result(id: impl Into<String>, name: impl Into<String>, payload: ToolResultPayload) -> Self {
        let _ = name;
        Self {
            role: Role::Tool,
            content: vec![ContentPart::ToolResult { id: id.into(), result: payload }],
        }
    }

    /// Concatenation of every [`ContentPart::Text`] part, in order.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every tool-call part carried by this message.
    pub fn tool_calls(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall { id, name, arguments } => {
                    Some((id.as_str(), name.as_str(), arguments))
                }
                _ => None,
            })
            .collect()
    }
}
