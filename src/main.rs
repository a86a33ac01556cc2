use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;

use mcp_chat::agent_core::{AgentEvent, OrchestrationLoop, SessionManager};
use mcp_chat::cli::{Cli, Command};
use mcp_chat::commands::{ask, chat_loop, describe_event, write_catalog, write_server_report};
use mcp_chat::config::{load_app_config, load_servers_config, AppConfig};
use mcp_chat::inference::InferenceClient;

fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the shell.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    mcp_chat::init_tracing(cli.log_file.as_deref()).context("failed to initialize logging")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(run(cli));
    // A stdin read may still be parked on a blocking thread after an
    // interrupt; dropping the runtime normally would wait for it.
    runtime.shutdown_background();
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "mcp-chat exited with an error");
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut app = match &cli.config {
        Some(path) => load_app_config(path)
            .with_context(|| format!("failed to load app config {}", path.display()))?,
        None => AppConfig::default(),
    };
    cli.apply_overrides(&mut app);

    let servers = load_servers_config(&cli.servers).with_context(|| {
        format!("failed to load server configuration {}", cli.servers.display())
    })?;

    let command = cli.subcommand();

    // Validate the model endpoint before any server process is spawned.
    let client = match command {
        Command::Tools => None,
        _ => Some(InferenceClient::from_config(app.model.clone()).context("invalid model configuration")?),
    };

    let mut session = SessionManager::start(&servers, app.servers.connect_options()).await;

    let outcome = match client {
        None => write_catalog(&session, &mut std::io::stdout()).map_err(anyhow::Error::from),
        Some(client) => converse(command, client, app, &session).await,
    };

    // Teardown runs on every exit path.
    session.shutdown().await;
    outcome
}

async fn converse(
    command: Command,
    client: InferenceClient,
    app: AppConfig,
    session: &SessionManager,
) -> anyhow::Result<()> {
    tracing::info!(
        endpoint = client.base_url(),
        model = %app.model.model,
        "model endpoint configured"
    );

    let mut agent = OrchestrationLoop::new(Box::new(client), app.agent).with_observer(Box::new(
        |event: &AgentEvent| {
            if let Some(line) = describe_event(event) {
                println!("{line}");
            }
        },
    ));
    let mut stdout = std::io::stdout();

    match command {
        Command::Ask { query } => {
            write_server_report(session, &mut std::io::stderr())?;
            ask(&mut agent, session.registry(), &query, &mut stdout).await
        }
        _ => {
            write_server_report(session, &mut stdout)?;
            stdout.flush()?;
            let stdin = BufReader::new(tokio::io::stdin());
            chat_loop(&mut agent, session.registry(), stdin, &mut stdout, interrupted()).await?;
            Ok(())
        }
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
