//! Server connection: one MCP tool-server session.
//!
//! Handles spawning the server process, the `initialize` handshake, catalog
//! retrieval, tool invocation, and teardown. Each server runs as a separate
//! OS process speaking JSON-RPC over stdio.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex;

use super::errors::McpError;
use super::transport::{extract_result, StdioTransport};
use super::types::{
    CallToolResult, InitializeResult, ListToolsResult, McpToolDefinition, ServerConfig,
    ServerInfo, ToolResult, PROTOCOL_VERSION,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default timeout for the initialize handshake.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for a single `tools/list` page or `tools/call`.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Time a server gets to exit after stdin closes before it is killed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on `tools/list` pages, guarding against a cursor that never ends.
const MAX_CATALOG_PAGES: usize = 64;

// ─── ToolServer ──────────────────────────────────────────────────────────────

/// A connected tool server: the operations the registry and the agent loop
/// need, independent of how the server is reached.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Configured name of the server.
    fn identity(&self) -> &str;

    /// Fetch the server's tool catalog.
    async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError>;

    /// Invoke a tool by name with structured arguments.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, McpError>;

    /// Release the session. Calling it again is a no-op.
    async fn close(&self) -> Result<(), McpError>;
}

// ─── Options ─────────────────────────────────────────────────────────────────

/// Timeouts applied to a connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    pub init_timeout: Duration,
    pub call_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            init_timeout: DEFAULT_INIT_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

// ─── ServerConnection ────────────────────────────────────────────────────────

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Connecting,
    Ready,
    Closed,
}

/// A session with one MCP server over stdio.
pub struct ServerConnection {
    /// Configured server name (e.g., "calculadora").
    name: String,
    transport: StdioTransport,
    /// Child process handle; `None` when attached to existing streams.
    process: Mutex<Option<Child>>,
    state: Mutex<Liveness>,
    server_info: Option<ServerInfo>,
    call_timeout: Duration,
}

impl ServerConnection {
    /// Spawn a server process and perform the initialization handshake.
    ///
    /// The child is spawned with `kill_on_drop`, so a connection dropped on
    /// any path (including a failed handshake) takes its process with it.
    pub async fn connect(
        name: &str,
        config: &ServerConfig,
        options: ConnectOptions,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some(dir) = config.cwd.as_deref() {
            cmd.current_dir(dir);
        }

        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
            name: name.to_string(),
            reason: format!("{} {}: {e}", config.command, config.args.join(" ")),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| McpError::SpawnFailed {
            name: name.to_string(),
            reason: "failed to capture stdin".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| McpError::SpawnFailed {
            name: name.to_string(),
            reason: "failed to capture stdout".into(),
        })?;
        if let Some(stderr) = child.stderr.take() {
            forward_stderr(name, stderr);
        }

        tracing::debug!(server = name, command = %config.command, "spawned server process");

        let transport = StdioTransport::new(name, stdin, stdout);
        Self::establish(name, transport, Some(child), options).await
    }

    /// Attach to a server over existing streams and perform the handshake.
    pub async fn attach<W, R>(
        name: &str,
        writer: W,
        reader: R,
        options: ConnectOptions,
    ) -> Result<Self, McpError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let transport = StdioTransport::new(name, writer, reader);
        Self::establish(name, transport, None, options).await
    }

    async fn establish(
        name: &str,
        transport: StdioTransport,
        process: Option<Child>,
        options: ConnectOptions,
    ) -> Result<Self, McpError> {
        let mut conn = Self {
            name: name.to_string(),
            transport,
            process: Mutex::new(process),
            state: Mutex::new(Liveness::Connecting),
            server_info: None,
            call_timeout: options.call_timeout,
        };

        let handshake = tokio::time::timeout(options.init_timeout, conn.initialize()).await;
        let info = match handshake {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = conn.close().await;
                return Err(McpError::InitFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                let _ = conn.close().await;
                return Err(McpError::InitFailed {
                    name: name.to_string(),
                    reason: format!(
                        "initialization timed out after {}s",
                        options.init_timeout.as_secs()
                    ),
                });
            }
        };

        tracing::info!(
            server = name,
            server_name = info.server_info.as_ref().and_then(|i| i.name.as_deref()).unwrap_or("?"),
            protocol = info.protocol_version.as_deref().unwrap_or("?"),
            "server initialized"
        );

        conn.server_info = info.server_info;
        *conn.state.lock().await = Liveness::Ready;
        Ok(conn)
    }

    /// Perform the MCP initialization handshake.
    async fn initialize(&self) -> Result<InitializeResult, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        });

        let response = self.transport.request("initialize", Some(params)).await?;
        let result = extract_result(&self.name, response)?;

        let init: InitializeResult =
            serde_json::from_value(result).map_err(|e| McpError::Protocol {
                server: self.name.clone(),
                reason: format!("failed to parse initialize response: {e}"),
            })?;

        self.transport
            .notify("notifications/initialized", None)
            .await?;

        Ok(init)
    }

    /// Current connection state.
    pub async fn liveness(&self) -> Liveness {
        *self.state.lock().await
    }

    /// Server info reported during the handshake.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    async fn ensure_ready(&self) -> Result<(), McpError> {
        match self.liveness().await {
            Liveness::Ready => Ok(()),
            _ => Err(McpError::Closed {
                name: self.name.clone(),
            }),
        }
    }

    /// Send a request bounded by the call timeout and unwrap its result.
    async fn timed_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let response = tokio::time::timeout(
            self.call_timeout,
            self.transport.request(method, Some(params)),
        )
        .await
        .map_err(|_| McpError::Timeout {
            server: self.name.clone(),
            method: method.to_string(),
            timeout_ms: self.call_timeout.as_millis() as u64,
        })??;

        extract_result(&self.name, response)
    }
}

#[async_trait]
impl ToolServer for ServerConnection {
    fn identity(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        self.ensure_ready().await?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_CATALOG_PAGES {
            let params = match cursor.take() {
                Some(c) => serde_json::json!({ "cursor": c }),
                None => serde_json::json!({}),
            };
            let result = self.timed_request("tools/list", params).await?;
            let page: ListToolsResult =
                serde_json::from_value(result).map_err(|e| McpError::Protocol {
                    server: self.name.clone(),
                    reason: format!("malformed tools/list response: {e}"),
                })?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        Err(McpError::Protocol {
            server: self.name.clone(),
            reason: format!("tools/list did not finish within {MAX_CATALOG_PAGES} pages"),
        })
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, McpError> {
        self.ensure_ready().await?;

        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        let result = self.timed_request("tools/call", params).await?;

        let call: CallToolResult =
            serde_json::from_value(result).map_err(|e| McpError::Protocol {
                server: self.name.clone(),
                reason: format!("malformed tools/call response for '{name}': {e}"),
            })?;

        let content = call.first_text().ok_or_else(|| McpError::Protocol {
            server: self.name.clone(),
            reason: format!("tools/call result for '{name}' has no text content"),
        })?;

        Ok(ToolResult {
            content: content.to_string(),
            is_error: call.is_error,
        })
    }

    async fn close(&self) -> Result<(), McpError> {
        {
            let mut state = self.state.lock().await;
            if *state == Liveness::Closed {
                return Ok(());
            }
            *state = Liveness::Closed;
        }

        // Closing stdin is the stdio shutdown signal; failures here still
        // fall through to reaping the process.
        if let Err(e) = self.transport.close().await {
            tracing::debug!(server = %self.name, error = %e, "stdin close failed");
        }

        if let Some(mut child) = self.process.lock().await.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::debug!(server = %self.name, %status, "server exited");
                }
                _ => {
                    tracing::warn!(server = %self.name, "server did not exit, killing");
                    child.kill().await.map_err(|e| McpError::TransportError {
                        server: self.name.clone(),
                        reason: format!("failed to kill server process: {e}"),
                    })?;
                }
            }
        }

        tracing::info!(server = %self.name, "connection closed");
        Ok(())
    }
}

/// Drain a server's stderr into the log so the pipe never fills.
fn forward_stderr(name: &str, stderr: ChildStderr) {
    let server = name.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(server = %server, "stderr: {line}");
        }
    });
}

// ─── Tests ───────────────────────────────────────────────────────────────────
