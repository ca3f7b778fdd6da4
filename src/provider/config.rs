//! Credentials and connection settings for the OpenAI-compatible adapter (§10.3).

use crate::error::LlmError;

/// Explicit setters always win; construction falls back to environment
/// variables only for fields left unset (§10.3).
#[derive(Debug, Clone, Default)]
pub struct OpenAiCompatConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    organization: Option<String>,
}

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

impl OpenAiCompatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Resolve the API key: explicit value, else `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String, LlmError> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LlmError::MissingApiKey("OPENAI_API_KEY".to_string()))
    }

    /// Resolve the base URL: explicit value, else `OPENAI_BASE_URL`, else the
    /// provider's public default. Trailing slashes are stripped.
    pub fn resolve_base_url(&self) -> String {
        let url = self
            .base_url
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url.trim_end_matches('/').to_string()
    }

    /// Resolve the organization header value, if any: explicit value, else
    /// `OPENAI_ORGANIZATION`.
    pub fn resolve_organization(&self) -> Option<String> {
        self.organization
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| std::env::var("OPENAI_ORGANIZATION").ok().filter(|v| !v.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn explicit_api_key_wins_over_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("OPENAI_API_KEY", "env-key");
        let config = OpenAiCompatConfig::new().api_key("explicit-key");
        assert_eq!(config.resolve_api_key().unwrap(), "explicit-key");
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn falls_back_to_env_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("OPENAI_API_KEY", "env-key");
        let config = OpenAiCompatConfig::new();
        assert_eq!(config.resolve_api_key().unwrap(), "env-key");
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("OPENAI_API_KEY");
        let config = OpenAiCompatConfig::new();
        assert!(matches!(config.resolve_api_key(), Err(LlmError::MissingApiKey(_))));
    }

    #[test]
    fn base_url_defaults_and_strips_trailing_slash() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("OPENAI_BASE_URL");
        assert_eq!(OpenAiCompatConfig::new().resolve_base_url(), DEFAULT_BASE_URL);

        let config = OpenAiCompatConfig::new().base_url("https://my-proxy.example.com/");
        assert_eq!(config.resolve_base_url(), "https://my-proxy.example.com");
    }
}
