//! Chat completion response parsing.
//!
//! Reads the first choice of a non-streaming response into a
//! [`ModelResponse`], decoding each tool call's JSON-string arguments.

use serde::Deserialize;
use uuid::Uuid;

use super::errors::InferenceError;
use super::types::{FinishReason, ModelResponse, ToolCall};

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Parse a `POST /chat/completions` response body.
pub fn parse_completion_response(body: &str) -> Result<ModelResponse, InferenceError> {
    let resp: CompletionBody =
        serde_json::from_str(body).map_err(|e| InferenceError::MalformedResponse {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::MalformedResponse {
            reason: "empty choices array".into(),
        })?;

    let mut tool_calls = Vec::new();
    for tc in choice.message.tool_calls.unwrap_or_default() {
        let arguments = decode_arguments(&tc.function.name, &tc.function.arguments)?;
        let id = tc
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("call_{}", Uuid::new_v4()));
        tool_calls.push(ToolCall {
            id,
            name: tc.function.name,
            arguments,
        });
    }

    Ok(ModelResponse {
        finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
        content: choice.message.content,
        tool_calls,
    })
}

/// Decode a tool call's JSON-string arguments. An empty string means no
/// arguments.
fn decode_arguments(tool: &str, raw: &str) -> Result<serde_json::Value, InferenceError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw).map_err(|e| InferenceError::ToolCallParseError {
        tool: tool.to_string(),
        raw_arguments: raw.to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
