//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;
use crate::mcp_client::McpError;

/// Errors that end a single `process_query`. None of them end the session.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A requested tool could not be dispatched or its invocation failed.
    #[error("tool '{tool}' failed: {reason}")]
    ToolInvocation { tool: String, reason: String },

    /// The model endpoint call failed.
    #[error("model endpoint error: {0}")]
    ModelEndpoint(#[from] InferenceError),

    /// The model kept returning a completion signal the loop cannot act on.
    #[error("unexpected model response '{finish_reason}' after {attempts} attempts")]
    UnexpectedResponse {
        finish_reason: String,
        attempts: u32,
    },

    /// The query used up its tool-round budget without a final answer.
    #[error("no final answer after {rounds} tool rounds")]
    ToolRoundsExhausted { rounds: u32 },
}

impl AgentError {
    /// Build a `ToolInvocation` from an MCP failure.
    pub fn tool(tool: &str, err: &McpError) -> Self {
        AgentError::ToolInvocation {
            tool: tool.to_string(),
            reason: err.to_string(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
