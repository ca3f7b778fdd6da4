//! The closed set of reasons a generation can end.

use serde::{Deserialize, Serialize};

/// Why a generation (or a tool loop) ended.
///
/// The loop's final reason is either returned verbatim by the provider for
/// its last step, or synthesized by the orchestrator (e.g. a stop condition's
/// name, or `"length-limit"` when `MaxSteps` is exhausted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
    Other(String),
}

impl FinishReason {
    /// Parse a provider's raw finish-reason string into the closed set,
    /// preserving unrecognized values under `Other`.
    pub fn from_provider_str(raw: &str) -> Self {
        match raw {
            "stop" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "tool_calls" | "function_call" => Self::ToolCalls,
            "content_filter" => Self::ContentFilter,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    /// A stop-condition-synthesized reason, carrying the condition's label.
    pub fn synthesized(reason: impl Into<String>) -> Self {
        Self::Other(reason.into())
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ToolCalls => write!(f, "tool-calls"),
            Self::ContentFilter => write!(f, "content-filter"),
            Self::Error => write!(f, "error"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_openai_values() {
        assert_eq!(FinishReason::from_provider_str("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider_str("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::from_provider_str("length"), FinishReason::Length);
    }

    #[test]
    fn unknown_value_preserved_verbatim() {
        assert_eq!(
            FinishReason::from_provider_str("weird_provider_reason"),
            FinishReason::Other("weird_provider_reason".to_string())
        );
    }

    #[test]
    fn display_matches_spec_vocabulary() {
        assert_eq!(FinishReason::ToolCalls.to_string(), "tool-calls");
        assert_eq!(FinishReason::synthesized("step-count-is").to_string(), "step-count-is");
    }
}
