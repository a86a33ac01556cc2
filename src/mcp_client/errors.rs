//! MCP client error types.

use thiserror::Error;

/// Errors that can occur while talking to MCP tool servers.
#[derive(Debug, Error)]
pub enum McpError {
    /// A server process failed to start.
    #[error("failed to spawn server '{name}': {reason}")]
    SpawnFailed {
        name: String,
        reason: String,
    },

    /// The initialization handshake failed or timed out.
    #[error("server '{name}' initialization failed: {reason}")]
    InitFailed {
        name: String,
        reason: String,
    },

    /// I/O or framing error on the stdio pipe.
    #[error("transport error for server '{server}': {reason}")]
    TransportError {
        server: String,
        reason: String,
    },

    /// Server returned a JSON-RPC error response.
    #[error("server '{server}' returned error [{code}]: {message}")]
    ServerError {
        server: String,
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// A response was well-framed JSON-RPC but its payload was not what the
    /// protocol promises (malformed catalog, result without text content).
    #[error("protocol error from server '{server}': {reason}")]
    Protocol {
        server: String,
        reason: String,
    },

    /// Tool not found in the aggregated registry.
    #[error("unknown tool: '{name}'")]
    UnknownTool {
        name: String,
    },

    /// A request did not complete within its deadline.
    #[error("'{method}' on server '{server}' timed out after {timeout_ms}ms")]
    Timeout {
        server: String,
        method: String,
        timeout_ms: u64,
    },

    /// The connection was already closed.
    #[error("server '{name}' is closed")]
    Closed {
        name: String,
    },
}

impl McpError {
    /// Whether this error happened while establishing the session.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, McpError::SpawnFailed { .. } | McpError::InitFailed { .. })
    }

    /// Name of the server the error relates to, when known.
    pub fn server(&self) -> Option<&str> {
        match self {
            McpError::SpawnFailed { name, .. }
            | McpError::InitFailed { name, .. }
            | McpError::Closed { name } => Some(name),
            McpError::TransportError { server, .. }
            | McpError::ServerError { server, .. }
            | McpError::Protocol { server, .. }
            | McpError::Timeout { server, .. } => Some(server),
            McpError::UnknownTool { .. } => None,
        }
    }
}
