//! Shared types for the agent core.
//!
//! Loop configuration and the progress events the loop reports to its
//! front end.

use serde::Deserialize;

// ─── Loop Configuration ─────────────────────────────────────────────────────

/// Default number of consecutive unusable model responses tolerated.
pub const DEFAULT_MAX_UNEXPECTED_RETRIES: u32 = 3;

/// Default number of tool rounds allowed per query.
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 10;

/// Bounds and prompt for the orchestration loop (`agent:` in the YAML config).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Retries after a response that is neither `stop` nor a usable
    /// `tool_calls`; the loop fails after `max_unexpected_retries + 1` such
    /// responses in a row.
    pub max_unexpected_retries: u32,
    /// Model responses with tool calls allowed before giving up.
    pub max_tool_rounds: u32,
    /// Prepended to every request as a `system` message.
    pub system_prompt: Option<String>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_unexpected_retries: DEFAULT_MAX_UNEXPECTED_RETRIES,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            system_prompt: None,
        }
    }
}

// ─── Events ─────────────────────────────────────────────────────────────────

/// Progress reported while a query runs.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// About to dispatch a tool call.
    ToolCall {
        name: String,
        server: String,
        arguments: serde_json::Value,
    },
    /// A tool returned.
    ToolResult {
        name: String,
        content: String,
        is_error: bool,
    },
    /// The model returned something the loop could not act on; retrying.
    Retry {
        finish_reason: String,
        attempt: u32,
    },
}

/// Callback receiving [`AgentEvent`]s.
pub type EventObserver = Box<dyn Fn(&AgentEvent) + Send + Sync>;

// ─── Tests ───────────────────────────────────────────────────────────────────
