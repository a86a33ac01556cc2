//! SessionManager: owns every tool-server connection for the life of a chat.
//!
//! Startup connects to each configured server independently, so one broken
//! entry never blocks the rest. Shutdown closes connections in reverse
//! connection order.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;

use crate::mcp_client::{
    ConnectOptions, McpError, McpServersConfig, ServerConfig, ServerConnection, ToolRegistry,
    ToolServer,
};

/// A configured server that contributed no tools.
#[derive(Debug)]
pub struct ServerFailure {
    pub server: String,
    pub error: McpError,
}

/// Connected servers plus the registry built from their catalogs.
pub struct SessionManager {
    /// Live connections in configuration order.
    connections: Vec<Arc<dyn ToolServer>>,
    registry: ToolRegistry,
    failures: Vec<ServerFailure>,
}

impl SessionManager {
    /// Spawn and connect every configured server.
    pub async fn start(config: &McpServersConfig, options: ConnectOptions) -> Self {
        Self::start_with(config, move |name, server| async move {
            ServerConnection::connect(&name, &server, options)
                .await
                .map(|conn| Arc::new(conn) as Arc<dyn ToolServer>)
        })
        .await
    }

    /// Like [`start`](Self::start), with a caller-supplied connector.
    pub async fn start_with<F, Fut>(config: &McpServersConfig, connect: F) -> Self
    where
        F: Fn(String, ServerConfig) -> Fut,
        Fut: Future<Output = Result<Arc<dyn ToolServer>, McpError>>,
    {
        if config.servers.is_empty() {
            tracing::warn!("no MCP servers configured; the model will have no tools");
        }

        // Connects may overlap; join_all yields results in configuration order.
        let attempts = config.servers.iter().map(|(name, server)| {
            let name = name.clone();
            let pending = connect(name.clone(), server.clone());
            async move { (name, pending.await) }
        });
        let outcomes = join_all(attempts).await;

        let mut manager = Self {
            connections: Vec::with_capacity(outcomes.len()),
            registry: ToolRegistry::new(),
            failures: Vec::new(),
        };

        // Catalogs are fetched one server at a time so registration order is
        // configuration order.
        for (name, outcome) in outcomes {
            let conn = match outcome {
                Ok(conn) => conn,
                Err(error) => {
                    tracing::error!(server = %name, error = %error, "failed to connect to server");
                    manager.failures.push(ServerFailure {
                        server: name,
                        error,
                    });
                    continue;
                }
            };

            match conn.list_tools().await {
                Ok(tools) => {
                    tracing::info!(
                        server = %name,
                        tools = tools.len(),
                        "registered server tools"
                    );
                    manager.registry.register_server_tools(&conn, tools);
                    manager.connections.push(conn);
                }
                Err(error) => {
                    tracing::error!(server = %name, error = %error, "failed to list tools");
                    if let Err(e) = conn.close().await {
                        tracing::warn!(server = %name, error = %e, "close after failed listing");
                    }
                    manager.failures.push(ServerFailure {
                        server: name,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            connected = manager.connections.len(),
            failed = manager.failures.len(),
            tools = manager.registry.len(),
            "session started"
        );
        manager
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Servers that failed to connect or to list their tools.
    pub fn failures(&self) -> &[ServerFailure] {
        &self.failures
    }

    /// Names of the connected servers, in configuration order.
    pub fn server_names(&self) -> Vec<&str> {
        self.connections.iter().map(|c| c.identity()).collect()
    }

    /// Close every connection, most recently connected first.
    ///
    /// A failing close is logged and the rest still close. Calling this
    /// again does nothing.
    pub async fn shutdown(&mut self) {
        self.registry = ToolRegistry::new();
        while let Some(conn) = self.connections.pop() {
            if let Err(e) = conn.close().await {
                tracing::warn!(server = conn.identity(), error = %e, "error closing server");
            }
        }
        tracing::info!("session shut down");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
