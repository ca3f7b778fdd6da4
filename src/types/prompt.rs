//! The caller-facing request shape, before the orchestrator normalizes it.

use super::message::Message;

/// Either a bare string (a single user message) or an explicit message list
/// plus an optional system string.
///
/// The orchestrator hoists the system string into the first system message
/// when normalizing; this never mutates the caller's original `Prompt`.
#[derive(Debug, Clone)]
pub enum Prompt {
    Text(String),
    Messages {
        system: Option<String>,
        messages: Vec<Message>,
    },
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn messages(messages: Vec<Message>) -> Self {
        Self::Messages { system: None, messages }
    }

    pub fn with_system(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self::Messages {
            system: Some(system.into()),
            messages,
        }
    }

    /// Normalize into a flat message list with the system string (if any)
    /// hoisted as the first message.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Text(text) => vec![Message::user(text)],
            Self::Messages { system, messages } => {
                let mut out = Vec::with_capacity(messages.len() + 1);
                if let Some(system) = system {
                    out.push(Message::system(system));
                }
                out.extend(messages);
                out
            }
        }
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
