//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

/// Chat with a language model that can call MCP tool servers.
#[derive(Debug, Parser)]
#[command(name = "mcp-chat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// MCP servers file (`{"mcpServers": {...}}`)
    #[arg(long, env = "MCP_CHAT_SERVERS", default_value = "server_config.json", global = true)]
    pub servers: PathBuf,

    /// YAML app config (model, agent and server timeout settings)
    #[arg(short = 'c', long, env = "MCP_CHAT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Model identifier
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// OpenAI-compatible base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// API key sent as a bearer token
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Maximum tokens per model response
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Log file path; `-` logs to stderr
    #[arg(long, env = "MCP_CHAT_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands. With none given, `chat` runs.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive chat (default)
    Chat,

    /// List the tools every configured server exposes, then exit
    Tools,

    /// Answer a single query, then exit
    Ask {
        /// The question to send
        query: String,
    },
}

impl Cli {
    /// The subcommand to run.
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    /// Apply flags on top of file/default config.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.model.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.model.base_url = base_url.clone();
        }
        if let Some(api_key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            config.model.api_key = Some(api_key.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            config.model.max_tokens = max_tokens;
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
