//! JSON-RPC over stdio transport.
//!
//! Handles low-level communication with an MCP server:
//! - Writing JSON-RPC requests to the server's stdin
//! - Reading JSON-RPC responses from the server's stdout
//! - Line-delimited JSON protocol (one JSON object per line)
//!
//! The transport is written against boxed async reader/writer halves so the
//! same code drives a child process and an in-memory duplex pipe.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::errors::McpError;
use super::types::{error_codes, JsonRpcMessage, JsonRpcRequest};

/// Write half of a transport.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Read half of a transport.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

// ─── Request ID Generator ────────────────────────────────────────────────────

/// Global monotonic request ID counter.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID.
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// Bi-directional JSON-RPC transport over a server's stdio.
pub struct StdioTransport {
    server_name: String,
    writer: Mutex<Option<BoxedWriter>>,
    reader: Mutex<BufReader<BoxedReader>>,
}

impl StdioTransport {
    /// Create a new transport from the server's input and output streams.
    pub fn new<W, R>(server_name: &str, writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            server_name: server_name.to_string(),
            writer: Mutex::new(Some(Box::new(writer))),
            reader: Mutex::new(BufReader::new(Box::new(reader))),
        }
    }

    /// Send a JSON-RPC request and wait for the matching response.
    ///
    /// Lines that are not the response to this request are handled in
    /// place: server `ping` requests are answered, other server requests are
    /// refused, notifications and non-JSON output are skipped.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcMessage, McpError> {
        let id = next_request_id();
        let req = JsonRpcRequest::new(id, method, params);

        let json = serde_json::to_string(&req).map_err(|e| McpError::TransportError {
            server: self.server_name.clone(),
            reason: format!("failed to serialize request: {e}"),
        })?;

        // Holding the reader for the whole exchange keeps one request in flight.
        let mut reader = self.reader.lock().await;
        self.write_line(json).await?;

        let mut line_buf = String::new();

        loop {
            line_buf.clear();
            let bytes_read = reader
                .read_line(&mut line_buf)
                .await
                .map_err(|e| McpError::TransportError {
                    server: self.server_name.clone(),
                    reason: format!("failed to read from stdout: {e}"),
                })?;

            if bytes_read == 0 {
                return Err(McpError::TransportError {
                    server: self.server_name.clone(),
                    reason: "server stdout closed (process may have exited)".into(),
                });
            }

            let trimmed = line_buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            let Ok(message) = serde_json::from_str::<JsonRpcMessage>(trimmed) else {
                tracing::debug!(server = %self.server_name, line = %trimmed, "skipping non-JSON-RPC output");
                continue;
            };

            if message.is_response_to(id) {
                return Ok(message);
            }

            if let (Some(method), Some(peer_id)) = (message.method.as_deref(), message.id.clone()) {
                self.answer_server_request(method, peer_id).await?;
            }
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    pub async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let mut notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        if let Some(params) = params {
            notification["params"] = params;
        }

        let json = serde_json::to_string(&notification).map_err(|e| {
            McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("failed to serialize notification: {e}"),
            }
        })?;
        self.write_line(json).await
    }

    /// Close the write half. The server sees EOF on stdin, which is the
    /// stdio shutdown signal. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), McpError> {
        let Some(mut writer) = self.writer.lock().await.take() else {
            return Ok(());
        };
        writer
            .shutdown()
            .await
            .map_err(|e| McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("failed to close stdin: {e}"),
            })
    }

    async fn answer_server_request(
        &self,
        method: &str,
        peer_id: serde_json::Value,
    ) -> Result<(), McpError> {
        let reply = if method == "ping" {
            serde_json::json!({"jsonrpc": "2.0", "id": peer_id, "result": {}})
        } else {
            tracing::debug!(server = %self.server_name, method, "refusing server request");
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": peer_id,
                "error": {
                    "code": error_codes::METHOD_NOT_FOUND,
                    "message": format!("client does not support '{method}'"),
                },
            })
        };
        self.write_line(reply.to_string()).await
    }

    async fn write_line(&self, mut json: String) -> Result<(), McpError> {
        json.push('\n');

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| McpError::Closed {
            name: self.server_name.clone(),
        })?;
        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("failed to write to stdin: {e}"),
            })?;
        writer
            .flush()
            .await
            .map_err(|e| McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("failed to flush stdin: {e}"),
            })
    }
}

// ─── Response Helpers ────────────────────────────────────────────────────────

/// Extract the result from a JSON-RPC response, converting errors to `McpError`.
pub fn extract_result(server: &str, response: JsonRpcMessage) -> Result<serde_json::Value, McpError> {
    if let Some(err) = response.error {
        return Err(McpError::ServerError {
            server: server.to_string(),
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }

    response.result.ok_or_else(|| McpError::Protocol {
        server: server.to_string(),
        reason: "response missing both result and error".into(),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
