//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility; these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur talking to the model endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The model endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout {
        duration_secs: u64,
    },

    /// Non-2xx HTTP response from the model endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// The response body was not a chat completion we can read.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        reason: String,
    },

    /// A tool call's `arguments` string was not valid JSON.
    #[error("tool call parse error for '{tool}': {reason}")]
    ToolCallParseError {
        tool: String,
        raw_arguments: String,
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl InferenceError {
    /// Whether the endpoint rejected our credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, InferenceError::HttpError { status: 401 | 403, .. })
    }

    /// Whether the endpoint asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, InferenceError::HttpError { status: 429, .. })
    }

    /// Extract the error body text, if this is an `HttpError`.
    pub fn error_body(&self) -> Option<&str> {
        match self {
            InferenceError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }
}
