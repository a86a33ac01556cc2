//! Model endpoint trait.

use async_trait::async_trait;

use super::errors::InferenceError;
use super::types::{ChatMessage, ModelResponse, ToolDefinition};

/// A chat-completion endpoint the agent loop can drive.
///
/// [`InferenceClient`](super::InferenceClient) implements this over HTTP;
/// tests substitute scripted responses.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Request one completion for the full transcript and tool catalog.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, InferenceError>;
}
