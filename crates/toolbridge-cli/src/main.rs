//! ToolBridge: line-mode chat client that lets an LLM call MCP tools.
//!
//! Usage:
//!   toolbridge weather.py                 Spawn `python weather.py` as the tool provider
//!   toolbridge build/index.js             Spawn `node build/index.js`
//!   toolbridge ./weather-server stdio     Run any other executable directly
//!   toolbridge http://localhost:8000/mcp  Connect over streamable HTTP

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use toolbridge_core::config::{load_layered, ConfigLevel};
use toolbridge_core::orchestrator::ToolActivity;
use toolbridge_core::{
    BackendKind, BridgeConfig, ConfigFile, ConfigProvider, ConsoleLogger, Exchange,
    FileConfigProvider, LogLevel, Logger, OrchestrationError, Session, Transport,
};

#[derive(Parser, Debug)]
#[command(name = "toolbridge")]
#[command(version)]
#[command(about = "Chat with an LLM that can call the tools of an MCP server")]
struct Cli {
    /// Server script, executable or http(s) URL; falls back to the configured provider
    server: Option<String>,

    /// Arguments passed to the server
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    server_args: Vec<String>,

    /// LLM backend (openai, anthropic, gemini, genai, mock)
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Model identifier
    #[arg(long)]
    model: Option<String>,

    /// Backend rounds allowed per query
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Extra configuration file, applied over the user and workspace files
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logger: Arc<dyn Logger> = if cli.verbose {
        Arc::new(ConsoleLogger::new().with_level(LogLevel::Debug))
    } else {
        Arc::new(ConsoleLogger::new())
    };

    let config = load_config(&cli).await?;
    let display_truncate = config.session.display_truncate;

    let session = Session::connect(&config, logger)
        .await
        .context("Failed to start session")?;

    let tool_names: Vec<String> = session.tools().into_iter().map(|t| t.name).collect();
    println!("Connected to server with tools: {tool_names:?}");

    session
        .scoped(|s| chat_loop(s, display_truncate).boxed())
        .await
}

/// Layer user, workspace and explicit config files, then the command line
async fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let user = FileConfigProvider::user();
    let workspace = FileConfigProvider::workspace(&cwd);
    let explicit = cli
        .config
        .as_ref()
        .map(|path| FileConfigProvider::new(path, ConfigLevel::Explicit));

    let mut sources: Vec<&dyn ConfigProvider> = vec![&user, &workspace];
    if let Some(explicit) = &explicit {
        sources.push(explicit);
    }

    let file = load_layered(&sources).await?;
    let config = file
        .merge(cli_overrides(cli))
        .resolve(|name| std::env::var(name).ok())?;

    if config.provider.command.is_none() && config.provider.url.is_none() {
        bail!("Usage: toolbridge <server_script_or_binary> [args...]");
    }
    Ok(config)
}

/// Configuration named on the command line
fn cli_overrides(cli: &Cli) -> ConfigFile {
    let mut overrides = ConfigFile::default();
    overrides.backend.kind = cli.backend;
    overrides.backend.model = cli.model.clone();
    overrides.session.max_rounds = cli.max_rounds;

    if let Some(server) = &cli.server {
        if server.starts_with("http://") || server.starts_with("https://") {
            overrides.provider.transport = Some(Transport::Http);
            overrides.provider.url = Some(server.clone());
        } else {
            let (command, args) = server_command(server, &cli.server_args);
            overrides.provider.transport = Some(Transport::Stdio);
            overrides.provider.command = Some(command);
            overrides.provider.args = Some(args);
        }
    }
    overrides
}

/// Pick the interpreter for a server script
fn server_command(server: &str, args: &[String]) -> (String, Vec<String>) {
    let interpreter = match Path::new(server).extension().and_then(|e| e.to_str()) {
        Some("py") => Some("python"),
        Some("js") => Some("node"),
        _ => None,
    };

    match interpreter {
        Some(interpreter) => {
            let mut full = vec![server.to_string()];
            full.extend_from_slice(args);
            (interpreter.to_string(), full)
        }
        None => (server.to_string(), args.to_vec()),
    }
}

async fn chat_loop(session: &mut Session, display_truncate: usize) -> Result<()> {
    println!("\nMCP Client Started!");
    println!("Type your queries or 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nQuery: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();

        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Some((name, enabled)) = tool_toggle(query) {
            session.set_tool_enabled(name, enabled);
            println!("\n{} {}", if enabled { "Enabled" } else { "Disabled" }, name);
            continue;
        }

        match query {
            "/tools" => print_tools(session),
            "/refresh" => match session.refresh_tools().await {
                Ok(tools) => println!("\nRefreshed: {} tools", tools.len()),
                Err(e) => println!("\nError: {}", e),
            },
            "/reset" => match session.reset() {
                Ok(()) => println!("\nConversation cleared."),
                Err(e) => println!("\nError: {}", e),
            },
            _ => match session.submit(query).await {
                Ok(exchange) => print_exchange(&exchange, display_truncate),
                Err(e) => {
                    print_failure(&e);
                    if e.is_session_fatal() {
                        break;
                    }
                }
            },
        }
    }
    Ok(())
}

/// `/enable <tool>` or `/disable <tool>`
fn tool_toggle(query: &str) -> Option<(&str, bool)> {
    let (command, name) = query.split_once(' ')?;
    let name = name.trim();
    match command {
        _ if name.is_empty() => None,
        "/enable" => Some((name, true)),
        "/disable" => Some((name, false)),
        _ => None,
    }
}

fn print_tools(session: &Session) {
    let tools = session.tools();
    if tools.is_empty() {
        println!("\nNo tools available.");
        return;
    }
    println!();
    for tool in tools {
        println!("  {} - {}", tool.name, tool.description);
    }
}

fn print_exchange(exchange: &Exchange, display_truncate: usize) {
    for activity in &exchange.tool_activity {
        println!("\n{}", describe_activity(activity, display_truncate));
    }
    println!("\n{}", exchange.text);
}

fn print_failure(error: &OrchestrationError) {
    if let Some(text) = error.partial_text() {
        println!("\n{}", text);
    }
    match error {
        OrchestrationError::MaxRoundsExceeded { rounds, .. } => {
            println!("\n[Stopped after {} tool rounds without a final answer]", rounds);
        }
        _ if error.is_degraded() => {
            println!("\n[Response incomplete: {}]", error);
        }
        _ => println!("\nError: {}", error),
    }
}

/// One tool call as shown to the user
fn describe_activity(activity: &ToolActivity, display_truncate: usize) -> String {
    let args = serde_json::to_string(&activity.request.arguments).unwrap_or_else(|_| "{}".to_string());
    let outcome = if activity.result.ok { "result" } else { "failed" };
    format!(
        "[Calling tool {} with args {}]\n  {}: {}",
        activity.request.tool_name,
        args,
        outcome,
        truncate(&activity.result.content, display_truncate)
    )
}

/// Shorten `text` to at most `max` characters
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max).collect();
    short.push_str("...");
    short
}
