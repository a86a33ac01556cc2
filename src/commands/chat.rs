//! Interactive chat and single-shot `ask`.
//!
//! The terminal is the chat surface: prompts and answers go to the output
//! writer, logs go to the log file.

use std::future::Future;
use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::agent_core::{AgentError, AgentEvent, OrchestrationLoop};
use crate::mcp_client::ToolRegistry;

/// Words that end the session, compared case-insensitively.
const EXIT_WORDS: &[&str] = &["salir", "exit", "quit"];

/// What a line of user input asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction<'a> {
    Exit,
    Empty,
    Query(&'a str),
}

/// Classify one line of input (surrounding whitespace ignored).
pub fn classify_input(line: &str) -> InputAction<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        InputAction::Empty
    } else if EXIT_WORDS.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
        InputAction::Exit
    } else {
        InputAction::Query(trimmed)
    }
}

/// Terminal line for a loop event, if it should be shown.
pub fn describe_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::ToolCall {
            name, arguments, ..
        } => Some(format!("---->🔧 Using tool '{name}': {arguments}")),
        AgentEvent::Retry { .. } => Some("⚠️ Retrying...".to_string()),
        AgentEvent::ToolResult { .. } => None,
    }
}

/// Extra advice printed under an error, for failures the user can fix.
pub fn error_hint(err: &AgentError) -> Option<&'static str> {
    match err {
        AgentError::ModelEndpoint(e) if e.is_auth_error() => {
            Some("Check OPENAI_API_KEY (or pass --api-key).")
        }
        AgentError::ModelEndpoint(e) if e.is_rate_limited() => {
            Some("The endpoint is rate limiting requests; wait a moment and try again.")
        }
        _ => None,
    }
}

/// Run the read/answer loop until an exit word, EOF, or `interrupt` fires
/// while waiting for input.
///
/// A failed query is reported and the loop continues with the same
/// conversation.
pub async fn chat_loop<R, W, I>(
    agent: &mut OrchestrationLoop,
    registry: &ToolRegistry,
    input: R,
    out: &mut W,
    interrupt: I,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    I: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    let mut lines = input.lines();

    writeln!(out, "\n🤖 Welcome to the MCP tools chat!")?;
    writeln!(out, "📝 Type your query ('salir' to quit)")?;

    loop {
        write!(out, "\n👤 You: ")?;
        out.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = &mut interrupt => {
                tracing::info!("interrupted while waiting for input");
                None
            }
        };

        let Some(line) = line else {
            writeln!(out, "\n👋 Bye")?;
            return Ok(());
        };

        let query = match classify_input(&line) {
            InputAction::Exit => {
                writeln!(out, "👋 Bye")?;
                return Ok(());
            }
            InputAction::Empty => continue,
            InputAction::Query(q) => q,
        };
        writeln!(out)?;

        match agent.process_query(registry, query).await {
            Ok(answer) => writeln!(out, "🤖 Bot: {answer}")?,
            Err(e) => {
                tracing::error!(error = %e, "query failed");
                writeln!(out, "❌ Error: {e}")?;
                if let Some(hint) = error_hint(&e) {
                    writeln!(out, "   {hint}")?;
                }
            }
        }
    }
}

/// Answer one query and print it.
pub async fn ask<W: Write>(
    agent: &mut OrchestrationLoop,
    registry: &ToolRegistry,
    query: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    let answer = agent.process_query(registry, query).await?;
    writeln!(out, "{answer}")?;
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
