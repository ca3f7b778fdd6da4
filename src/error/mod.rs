//! Error handling for the runtime.
//!
//! A single [`LlmError`] crosses every public API boundary. See the module
//! docs on individual variants for which layer constructs them.

mod conversions;

use thiserror::Error;

/// Coarse classification of an [`LlmError`], useful for metrics and for the
/// optional retry helper in [`crate::retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Transport,
    Protocol,
    Auth,
    RateLimit,
    Validation,
    ToolExecution,
    Cancellation,
    Internal,
}

/// The single error type returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Non-2xx response or transport failure talking to a provider.
    #[error("provider http error ({provider}/{model}, status={status:?}): {message}")]
    ProviderHttpError {
        provider: String,
        model: String,
        status: Option<u16>,
        message: String,
    },

    /// Malformed SSE framing, bad JSON in a chunk, or a missing required field.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A tool executor returned an error or panicked.
    #[error("tool '{tool_name}' execution failed: {message}")]
    ToolExecutionError { tool_name: String, message: String },

    /// Tool-call arguments didn't parse, or failed a strict-mode schema check.
    #[error("invalid arguments for tool '{tool_name}': {message}")]
    InvalidArgumentsError { tool_name: String, message: String },

    /// Final JSON failed schema validation or typed projection.
    #[error("invalid structured output: {message}")]
    InvalidStructuredOutputError { message: String, raw_text: String },

    /// A custom stop condition panicked.
    #[error("stop condition panicked: {0}")]
    StopConditionPanic(String),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    CancellationError,

    /// Lower-level building blocks used to construct the above.
    #[error("http error: {0}")]
    HttpError(String),

    #[error("json error: {0}")]
    JsonError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("missing api key: set {0}")]
    MissingApiKey(String),

    #[error("authentication error: {0}")]
    AuthenticationError(String),

    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimitError { retry_after_ms: Option<u64> },

    #[error("operation timed out")]
    TimeoutError,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl LlmError {
    /// Coarse category, used by the optional retry helper and by metrics.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderHttpError { .. } | Self::HttpError(_) | Self::TimeoutError => {
                ErrorCategory::Transport
            }
            Self::ProtocolError(_) | Self::JsonError(_) | Self::ParseError(_) => {
                ErrorCategory::Protocol
            }
            Self::MissingApiKey(_) | Self::AuthenticationError(_) => ErrorCategory::Auth,
            Self::RateLimitError { .. } => ErrorCategory::RateLimit,
            Self::InvalidArgumentsError { .. } | Self::InvalidStructuredOutputError { .. } => {
                ErrorCategory::Validation
            }
            Self::ToolExecutionError { .. } | Self::StopConditionPanic(_) => {
                ErrorCategory::ToolExecution
            }
            Self::CancellationError => ErrorCategory::Cancellation,
            Self::ConfigurationError(_)
            | Self::UnsupportedOperation(_)
            | Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether an automatic retry is plausibly worthwhile. Consulted only by
    /// the opt-in helper in [`crate::retry`]; the core never retries on its
    /// own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderHttpError { status, .. } => {
                matches!(status, None | Some(429) | Some(500..=599))
            }
            Self::HttpError(_) | Self::TimeoutError | Self::RateLimitError { .. } => true,
            _ => false,
        }
    }

    pub fn provider_http(
        provider: impl Into<String>,
        model: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderHttpError {
            provider: provider.into(),
            model: model.into(),
            status,
            message: message.into(),
        }
    }

    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecutionError {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_arguments(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgumentsError {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_structured_output(
        message: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self::InvalidStructuredOutputError {
            message: message.into(),
            raw_text: raw_text.into(),
        }
    }
}
