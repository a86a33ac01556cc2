//! MCP Client: JSON-RPC over stdio transport for MCP tool servers.
//!
//! This module handles:
//! - Spawning MCP server child processes and the initialize handshake
//! - JSON-RPC 2.0 communication over process stdio
//! - Tool discovery and aggregation across all servers
//! - Tool call routing to the owning server
//!
//! The agent loop depends on [`ToolServer`] and [`ToolRegistry`] only; the
//! subprocess details stay in [`connection`] and [`transport`].

pub mod connection;
pub mod errors;
pub mod registry;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use connection::{ConnectOptions, Liveness, ServerConnection, ToolServer};
pub use errors::McpError;
pub use registry::{RegisteredTool, ToolRegistry};
pub use types::{McpServersConfig, McpToolDefinition, ServerConfig, ToolResult};
