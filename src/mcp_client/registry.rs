//! Tool registry: aggregates tool definitions across all MCP servers.
//!
//! Provides:
//! - Routing from tool name to the server that owns it
//! - The flat tool catalog in the model endpoint's declaration format
//!
//! Tool names are used exactly as the servers advertise them. When two
//! servers expose the same name, the later registration wins the route and
//! the descriptor, while the catalog keeps the position of the first.

use std::collections::HashMap;
use std::sync::Arc;

use crate::inference::types::{FunctionDefinition, ToolDefinition};

use super::connection::ToolServer;
use super::types::McpToolDefinition;

/// A tool together with the server that serves it.
#[derive(Clone)]
pub struct RegisteredTool {
    pub server_name: String,
    pub definition: McpToolDefinition,
    pub owner: Arc<dyn ToolServer>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("server_name", &self.server_name)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

// ─── ToolRegistry ────────────────────────────────────────────────────────────

/// Aggregated tool registry across all MCP servers.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Tool names in first-registration order.
    order: Vec<String>,
    /// `tool_name → registered tool`.
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one tool owned by `owner`.
    pub fn register(
        &mut self,
        server_name: &str,
        definition: McpToolDefinition,
        owner: Arc<dyn ToolServer>,
    ) {
        let name = definition.name.clone();
        let entry = RegisteredTool {
            server_name: server_name.to_string(),
            definition,
            owner,
        };

        match self.tools.insert(name.clone(), entry) {
            Some(previous) => {
                tracing::warn!(
                    tool = %name,
                    previous_server = %previous.server_name,
                    server = server_name,
                    "tool name collision; later server takes over the route"
                );
            }
            None => self.order.push(name),
        }
    }

    /// Register a server's whole catalog, in catalog order.
    pub fn register_server_tools(
        &mut self,
        owner: &Arc<dyn ToolServer>,
        tools: Vec<McpToolDefinition>,
    ) {
        let server_name = owner.identity().to_string();
        for tool in tools {
            self.register(&server_name, tool, Arc::clone(owner));
        }
    }

    /// The server that owns a tool.
    pub fn resolve(&self, tool_name: &str) -> Option<Arc<dyn ToolServer>> {
        self.tools.get(tool_name).map(|t| Arc::clone(&t.owner))
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<&McpToolDefinition> {
        self.tools.get(name).map(|t| &t.definition)
    }

    /// Name of the server that owns a tool.
    pub fn get_server_for_tool(&self, tool_name: &str) -> Option<&str> {
        self.tools.get(tool_name).map(|t| t.server_name.as_str())
    }

    /// All registered tools in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    /// Registered tool names in catalog order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Tool names served by one server, in catalog order.
    pub fn tools_for_server(&self, server_name: &str) -> Vec<&str> {
        self.iter()
            .filter(|t| t.server_name == server_name)
            .map(|t| t.definition.name.as_str())
            .collect()
    }

    /// The catalog as OpenAI function-calling tool definitions.
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.iter()
            .map(|t| ToolDefinition {
                r#type: "function".to_string(),
                function: FunctionDefinition {
                    name: t.definition.name.clone(),
                    description: t.definition.description.clone(),
                    parameters: t.definition.input_schema.clone(),
                },
            })
            .collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockToolServer;

    fn sample_tool(name: &str) -> McpToolDefinition {
        McpToolDefinition {
            name: name.to_string(),
            description: format!("The {name} tool"),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            }),
        }
    }

    fn server(name: &str) -> Arc<dyn ToolServer> {
        Arc::new(MockToolServer::new(name, vec![]))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut reg = ToolRegistry::new();
        let calc = server("calc");
        reg.register_server_tools(&calc, vec![sample_tool("multiplicar"), sample_tool("sumar")]);

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.resolve("multiplicar").unwrap().identity(), "calc");
        assert_eq!(reg.get_server_for_tool("sumar"), Some("calc"));
        assert!(reg.resolve("dividir").is_none());
    }

    #[test]
    fn test_collision_last_write_wins() {
        let mut reg = ToolRegistry::new();
        let first = server("first");
        let second = server("second");
        reg.register_server_tools(&first, vec![sample_tool("echo"), sample_tool("sumar")]);

        let mut replacement = sample_tool("echo");
        replacement.description = "second echo".into();
        reg.register_server_tools(&second, vec![replacement]);

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.resolve("echo").unwrap().identity(), "second");
        assert_eq!(reg.get_tool("echo").unwrap().description, "second echo");
        // Catalog position comes from the first registration.
        assert_eq!(reg.tool_names(), vec!["echo", "sumar"]);
        assert_eq!(reg.tools_for_server("first"), vec!["sumar"]);
    }

    #[test]
    fn test_catalog_order_and_format() {
        let mut reg = ToolRegistry::new();
        reg.register_server_tools(&server("b"), vec![sample_tool("zeta"), sample_tool("alpha")]);
        reg.register_server_tools(&server("a"), vec![sample_tool("mid")]);

        let catalog = reg.catalog();
        let names: Vec<&str> = catalog.iter().map(|t| t.function.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        let json = serde_json::to_value(&catalog[0]).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "zeta");
        assert_eq!(json["function"]["parameters"]["required"][0], "a");
    }

    #[test]
    fn test_empty_registry() {
        let reg = ToolRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.catalog().is_empty());
    }
}
