//! Start-up report and the `tools` command.

use std::io::Write;

use crate::agent_core::SessionManager;

/// Print failed servers and each connected server's tool names.
pub fn write_server_report<W: Write>(session: &SessionManager, out: &mut W) -> std::io::Result<()> {
    for failure in session.failures() {
        writeln!(out, "❌ Server '{}' unavailable: {}", failure.server, failure.error)?;
    }
    for server in session.server_names() {
        let tools = session.registry().tools_for_server(server);
        writeln!(out, "🔧 Tools available for '{server}': {tools:?}")?;
    }
    if session.registry().is_empty() {
        writeln!(out, "⚠️ No tools available; the model will answer on its own.")?;
    }
    Ok(())
}

/// Print the full aggregated catalog with descriptions.
pub fn write_catalog<W: Write>(session: &SessionManager, out: &mut W) -> std::io::Result<()> {
    write_server_report(session, out)?;
    for tool in session.registry().iter() {
        writeln!(out)?;
        writeln!(out, "{} ({})", tool.definition.name, tool.server_name)?;
        if !tool.definition.description.is_empty() {
            writeln!(out, "    {}", tool.definition.description)?;
        }
        writeln!(out, "    schema: {}", tool.definition.input_schema)?;
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
