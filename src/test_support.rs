//! Test doubles shared by the unit tests.
//!
//! - [`spawn_fake_server`]: an in-process MCP server over `tokio::io::duplex`,
//!   driven through the real transport and connection code
//! - [`MockToolServer`]: a [`ToolServer`] with canned tools and results
//! - [`ScriptedModel`]: a [`ModelEndpoint`] replaying canned responses

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use crate::inference::types::{ChatMessage, ModelResponse, ToolDefinition};
use crate::inference::{InferenceError, ModelEndpoint};
use crate::mcp_client::types::McpToolDefinition;
use crate::mcp_client::{McpError, ToolResult, ToolServer};

/// A tool definition with an `{a, b}` integer schema.
pub fn tool(name: &str) -> McpToolDefinition {
    McpToolDefinition {
        name: name.to_string(),
        description: format!("The {name} tool"),
        input_schema: json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}}
        }),
    }
}

// ─── Fake stdio server ──────────────────────────────────────────────────────

type Handler = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A tool served by the fake server.
#[derive(Clone)]
pub struct FakeTool {
    name: String,
    description: String,
    handler: Handler,
    is_error: bool,
}

impl FakeTool {
    pub fn new<F>(name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            handler: Arc::new(handler),
            is_error: false,
        }
    }

    /// Report every call as a tool-level failure (`isError: true`).
    pub fn erroring(mut self) -> Self {
        self.is_error = true;
        self
    }
}

/// Start a fake MCP server; returns the client's `(writer, reader)` pair.
pub fn spawn_fake_server(name: &str, tools: Vec<FakeTool>) -> (DuplexStream, DuplexStream) {
    spawn_paged_fake_server(name, tools, usize::MAX)
}

/// Like [`spawn_fake_server`], paging `tools/list` after `page_size` tools.
pub fn spawn_paged_fake_server(
    name: &str,
    tools: Vec<FakeTool>,
    page_size: usize,
) -> (DuplexStream, DuplexStream) {
    let (client_writer, server_reader) = tokio::io::duplex(64 * 1024);
    let (mut server_writer, client_reader) = tokio::io::duplex(64 * 1024);
    let server_name = format!("fake-{name}");

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(msg) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            // Notifications get no reply.
            let Some(id) = msg.get("id").cloned() else {
                continue;
            };
            let method = msg["method"].as_str().unwrap_or_default();
            let reply = match method {
                "initialize" => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "protocolVersion": "2024-11-05",
                        "capabilities": {"tools": {}},
                        "serverInfo": {"name": server_name, "version": "0.1.0"}
                    }
                }),
                "tools/list" => {
                    let start: usize = msg["params"]["cursor"]
                        .as_str()
                        .and_then(|c| c.parse().ok())
                        .unwrap_or(0);
                    let end = start.saturating_add(page_size).min(tools.len());
                    let page: Vec<Value> = tools[start..end]
                        .iter()
                        .map(|t| {
                            json!({
                                "name": t.name,
                                "description": t.description,
                                "inputSchema": {"type": "object"}
                            })
                        })
                        .collect();
                    let mut result = json!({ "tools": page });
                    if end < tools.len() {
                        result["nextCursor"] = json!(end.to_string());
                    }
                    json!({"jsonrpc": "2.0", "id": id, "result": result})
                }
                "tools/call" => {
                    let tool_name = msg["params"]["name"].as_str().unwrap_or_default();
                    match tools.iter().find(|t| t.name == tool_name) {
                        Some(t) => {
                            let text = (t.handler)(&msg["params"]["arguments"]);
                            json!({
                                "jsonrpc": "2.0",
                                "id": id,
                                "result": {
                                    "content": [{"type": "text", "text": text}],
                                    "isError": t.is_error
                                }
                            })
                        }
                        None => json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "error": {"code": -32602, "message": format!("Unknown tool: {tool_name}")}
                        }),
                    }
                }
                other => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": format!("Method not found: {other}")}
                }),
            };

            let mut out = reply.to_string();
            out.push('\n');
            if server_writer.write_all(out.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    (client_writer, client_reader)
}

// ─── MockToolServer ─────────────────────────────────────────────────────────

/// Recorded `(tool, arguments)` pairs.
pub type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

/// In-memory [`ToolServer`].
pub struct MockToolServer {
    name: String,
    tools: Vec<McpToolDefinition>,
    results: HashMap<String, ToolResult>,
    fail_list: bool,
    fail_calls: bool,
    fail_close: bool,
    calls: CallLog,
    closes: AtomicUsize,
    close_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl MockToolServer {
    pub fn new(name: &str, tools: Vec<McpToolDefinition>) -> Self {
        Self {
            name: name.to_string(),
            tools,
            results: HashMap::new(),
            fail_list: false,
            fail_calls: false,
            fail_close: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            closes: AtomicUsize::new(0),
            close_log: None,
        }
    }

    pub fn with_result(mut self, tool: &str, content: &str) -> Self {
        self.results.insert(
            tool.to_string(),
            ToolResult {
                content: content.to_string(),
                is_error: false,
            },
        );
        self
    }

    pub fn with_error_result(mut self, tool: &str, content: &str) -> Self {
        self.results.insert(
            tool.to_string(),
            ToolResult {
                content: content.to_string(),
                is_error: true,
            },
        );
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Append this server's name to `log` on every close.
    pub fn recording_closes(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.close_log = Some(log);
        self
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolServer for MockToolServer {
    fn identity(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        if self.fail_list {
            return Err(McpError::Protocol {
                server: self.name.clone(),
                reason: "malformed tools/list response".into(),
            });
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult, McpError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        if self.fail_calls {
            return Err(McpError::TransportError {
                server: self.name.clone(),
                reason: "broken pipe".into(),
            });
        }
        Ok(self.results.get(name).cloned().unwrap_or(ToolResult {
            content: String::new(),
            is_error: false,
        }))
    }

    async fn close(&self) -> Result<(), McpError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.close_log {
            log.lock().unwrap().push(self.name.clone());
        }
        if self.fail_close {
            return Err(McpError::TransportError {
                server: self.name.clone(),
                reason: "kill failed".into(),
            });
        }
        Ok(())
    }
}

// ─── ScriptedModel ──────────────────────────────────────────────────────────

/// One request received by a [`ScriptedModel`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// A [`ModelEndpoint`] that replays a fixed script. Clones share state, so a
/// test can keep one handle while the loop owns another.
#[derive(Clone)]
pub struct ScriptedModel {
    script: Arc<Mutex<VecDeque<Result<ModelResponse, InferenceError>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<ModelResponse, InferenceError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelEndpoint for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, InferenceError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(InferenceError::MalformedResponse {
                    reason: "script exhausted".into(),
                })
            })
    }
}
