//! Configuration loading.
//!
//! Two files feed a session:
//! - the servers file (`server_config.json`, `{"mcpServers": {...}}`), which
//!   says which tool servers to launch
//! - an optional YAML app config with `model:`, `agent:` and `servers:`
//!   sections
//!
//! Both are interpolated before parsing: `${VAR}` and `${VAR:-default}` are
//! replaced from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::agent_core::LoopConfig;
use crate::inference::ModelConfig;
use crate::mcp_client::connection::{DEFAULT_CALL_TIMEOUT, DEFAULT_INIT_TIMEOUT};
use crate::mcp_client::{ConnectOptions, McpServersConfig};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON/YAML for its schema.
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A value parsed but cannot be used.
    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

// ─── App Config ──────────────────────────────────────────────────────────────

/// Handshake and call timeouts for tool servers (`servers:` section).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerTimeouts {
    pub init_timeout_secs: u64,
    pub call_timeout_secs: u64,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            init_timeout_secs: DEFAULT_INIT_TIMEOUT.as_secs(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
        }
    }
}

impl ServerTimeouts {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            init_timeout: Duration::from_secs(self.init_timeout_secs),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
        }
    }
}

/// The YAML app config. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub agent: LoopConfig,
    pub servers: ServerTimeouts,
}

impl AppConfig {
    /// Reject values no session could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.init_timeout_secs == 0 || self.servers.call_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "server timeouts must be greater than zero".into(),
            });
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(ConfigError::Invalid {
                reason: "agent.max_tool_rounds must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Load and parse the YAML app config.
pub fn load_app_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let interpolated = read_interpolated(path)?;

    // An empty file is a valid "all defaults" config.
    if interpolated.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let config: AppConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    config.validate()?;
    Ok(config)
}

/// Load and parse the servers file.
///
/// A file without servers parses to an empty list; the caller decides how
/// loudly to complain.
pub fn load_servers_config(path: &Path) -> Result<McpServersConfig, ConfigError> {
    let interpolated = read_interpolated(path)?;

    let mut config: McpServersConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    for (name, server) in &mut config.servers {
        if server.command.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: format!("server '{name}' has an empty command"),
            });
        }
        server.command = expand_tilde(&server.command);
        server.cwd = server.cwd.as_deref().map(expand_tilde);
    }

    tracing::debug!(
        path = %path.display(),
        servers = config.servers.len(),
        "loaded servers config"
    );
    Ok(config)
}

fn read_interpolated(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(interpolate_env_vars(&raw))
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve `VAR` or `VAR:-default`; unset variables without a default
/// become empty.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => {
            std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__MCP_CHAT_UNSET_VAR__");
        let result = interpolate_env_vars("${__MCP_CHAT_UNSET_VAR__:-python3}");
        assert_eq!(result, "python3");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__MCP_CHAT_TEST_VAR__", "/opt/servers");
        let result = interpolate_env_vars("cwd: ${__MCP_CHAT_TEST_VAR__:-/fallback}/calc");
        assert_eq!(result, "cwd: /opt/servers/calc");
        std::env::remove_var("__MCP_CHAT_TEST_VAR__");
    }

    #[test]
    fn test_interpolate_unset_without_default_is_empty() {
        std::env::remove_var("__MCP_CHAT_MISSING__");
        assert_eq!(interpolate_env_vars("a${__MCP_CHAT_MISSING__}b"), "ab");
        assert_eq!(interpolate_env_vars("no vars, $HOME stays"), "no vars, $HOME stays");
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/servers");
        assert!(!result.starts_with('~'));
        assert!(result.ends_with("/servers"));
        assert_eq!(expand_tilde("/abs/path"), "/abs/path");
    }

    #[test]
    fn test_load_servers_config_keeps_file_order() {
        let file = write_temp(
            r#"{
                "mcpServers": {
                    "calculadora": {"command": "python", "args": ["mcp_calculadora.py"]},
                    "archivos": {"command": "npx", "args": ["-y", "server-fs"], "env": {"ROOT": "/tmp"}},
                    "busqueda": {"command": "uvx", "args": ["mcp-search"]}
                }
            }"#,
        );
        let config = load_servers_config(file.path()).unwrap();
        let names: Vec<&str> = config.servers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["calculadora", "archivos", "busqueda"]);
        assert_eq!(config.servers[0].1.args, vec!["mcp_calculadora.py"]);
        assert_eq!(config.servers[1].1.env.get("ROOT").map(String::as_str), Some("/tmp"));
    }

    #[test]
    fn test_load_servers_config_without_servers_is_empty() {
        let file = write_temp("{}");
        assert!(load_servers_config(file.path()).unwrap().servers.is_empty());

        let file = write_temp(r#"{"mcpServers": {}}"#);
        assert!(load_servers_config(file.path()).unwrap().servers.is_empty());
    }

    #[test]
    fn test_load_servers_config_errors() {
        let missing = Path::new("/nonexistent/server_config.json");
        assert!(matches!(load_servers_config(missing), Err(ConfigError::Read { .. })));

        let file = write_temp("{ not json");
        assert!(matches!(load_servers_config(file.path()), Err(ConfigError::Parse { .. })));

        let file = write_temp(r#"{"mcpServers": {"calc": {"args": []}}}"#);
        assert!(matches!(load_servers_config(file.path()), Err(ConfigError::Parse { .. })));

        let file = write_temp(r#"{"mcpServers": {"calc": {"command": " "}}}"#);
        assert!(matches!(load_servers_config(file.path()), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_app_config_sections() {
        std::env::set_var("__MCP_CHAT_KEY__", "sk-from-env");
        let file = write_temp(
            r#"
model:
  base_url: "http://localhost:11434/v1"
  model: llama3.1
  api_key: "${__MCP_CHAT_KEY__}"
agent:
  max_unexpected_retries: 1
  system_prompt: "Usa las herramientas"
servers:
  call_timeout_secs: 5
"#,
        );
        let config = load_app_config(file.path()).unwrap();
        std::env::remove_var("__MCP_CHAT_KEY__");

        assert_eq!(config.model.model, "llama3.1");
        assert_eq!(config.model.api_key.as_deref(), Some("sk-from-env"));
        assert_eq!(config.model.max_tokens, 2024);
        assert_eq!(config.agent.max_unexpected_retries, 1);
        assert_eq!(config.agent.max_tool_rounds, 10);
        assert_eq!(config.servers.init_timeout_secs, 30);
        assert_eq!(
            config.servers.connect_options().call_timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_load_app_config_empty_and_invalid() {
        let file = write_temp("");
        assert_eq!(load_app_config(file.path()).unwrap(), AppConfig::default());

        let file = write_temp("servers:\n  init_timeout_secs: 0\n");
        assert!(matches!(load_app_config(file.path()), Err(ConfigError::Invalid { .. })));
    }
}
