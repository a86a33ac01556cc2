//! Model endpoint configuration.
//!
//! Defaults target Gemini's OpenAI-compatible endpoint; any server speaking
//! the Chat Completions API works by changing `base_url` and `model`.

use serde::Deserialize;

use super::errors::InferenceError;

/// Default OpenAI-compatible base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default cap on generated tokens per model call.
pub const DEFAULT_MAX_TOKENS: u32 = 2024;

/// Default total request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration for the model endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Bearer token; `None` sends no `Authorization` header.
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ModelConfig {
    /// `{base_url}/chat/completions`, tolerating a trailing slash.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Reject settings the endpoint could never accept.
    pub fn validate(&self) -> Result<(), InferenceError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(InferenceError::ConfigError {
                reason: format!("base_url must be an http(s) URL, got '{}'", self.base_url),
            });
        }
        if self.model.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "model must not be empty".into(),
            });
        }
        if self.max_tokens == 0 {
            return Err(InferenceError::ConfigError {
                reason: "max_tokens must be greater than zero".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(InferenceError::ConfigError {
                reason: "request_timeout_secs must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_tokens, 2024);
        assert!(config.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let config = ModelConfig {
            base_url: "http://localhost:11434/v1/".into(),
            ..ModelConfig::default()
        };
        assert_eq!(config.completions_url(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
            model: llama3.1
            base_url: "http://localhost:11434/v1"
        "#;
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model, "llama3.1");
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = ModelConfig {
            base_url: "localhost:8080".into(),
            ..ModelConfig::default()
        };
        assert!(matches!(config.validate(), Err(InferenceError::ConfigError { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_request_timeout() {
        let config = ModelConfig {
            request_timeout_secs: 0,
            ..ModelConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }
}
