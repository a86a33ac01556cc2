//! Inference Client: OpenAI-compatible API client for the model endpoint.
//!
//! This module handles all communication with the model:
//! - Non-streaming chat completions with tool declarations
//! - Tool call decoding (JSON-string arguments to structured values)
//! - Endpoint configuration
//!
//! The client speaks the OpenAI Chat Completions API, so Gemini's
//! compatibility endpoint, OpenAI, Ollama or vLLM are a config change, not a
//! code change.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod errors;
pub mod response;
pub mod types;

// Re-exports for convenience
pub use client::InferenceClient;
pub use config::ModelConfig;
pub use endpoint::ModelEndpoint;
pub use errors::InferenceError;
pub use types::{ChatMessage, FinishReason, ModelResponse, Role, ToolCall, ToolDefinition};
