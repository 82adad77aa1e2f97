//! Command-line interface for the Wayfarer travel assistant.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wayfarer_agent::{ResponseOrchestrator, Surface};
use wayfarer_api::{AppConfig, RunOptions};
use wayfarer_core::config::{env_string, env_vars};
use wayfarer_core::Platform;
use wayfarer_llm::OpenAiClient;
use wayfarer_tools::{default_registry, ToolsConfig};

/// Wayfarer - AI travel assistant for the web and Telegram.
#[derive(Parser, Debug)]
#[command(name = "wayfarer")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to ./config.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web server (and the Telegram bot when configured).
    Serve {
        /// Host to bind to.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to.
        #[arg(short, long)]
        port: Option<u16>,
        /// Do not start the Telegram bot even if a token is set.
        #[arg(long)]
        no_telegram: bool,
    },
    /// Chat with the assistant in the terminal.
    Chat,
    /// List tools, or run one directly.
    Tools {
        /// Tool to run, e.g. `search_hotels`.
        #[arg(long)]
        run: Option<String>,
        /// JSON arguments for `--run`.
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Serve {
            host,
            port,
            no_telegram,
        } => {
            let mut config = AppConfig::load(args.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            wayfarer_api::run(
                config,
                RunOptions {
                    telegram: !no_telegram,
                },
            )
            .await
        }
        Command::Chat => run_chat(args.config).await,
        Command::Tools { run, args: raw } => match run {
            Some(name) => run_tool(&name, &raw).await,
            None => {
                list_tools();
                Ok(())
            }
        },
    }
}

/// `RUST_LOG` wins, then `LOG_LEVEL`, then `wayfarer=info`.
fn init_logging(verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        env_string(env_vars::LOG_LEVEL).unwrap_or_else(|| "info".to_string())
    };

    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("wayfarer={}", level))
            .add_directive(tracing::Level::WARN.into())
    });

    if json_logging {
        // JSON format for production/container environments
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }
}

/// Interactive chat through the same orchestrator the server uses.
async fn run_chat(config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let llm = OpenAiClient::new(config.openai_config()).context("failed to create LLM client")?;
    let tools = default_registry(&config.tools_config());
    let orchestrator = ResponseOrchestrator::new(Arc::new(llm), Arc::new(tools))
        .with_config(config.orchestrator_config());

    let user_id = "cli";

    println!("Wayfarer - Chat Mode");
    println!("====================\n");
    println!("Model: {}", orchestrator.model_name());
    println!("\nType your message and press Enter to send.");
    println!("Type 'quit' or 'exit' to quit.");
    println!("Type 'clear' to clear conversation history.\n");

    let mut input = String::new();
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            println!("Goodbye!");
            break;
        }
        if input == "clear" {
            orchestrator.clear_conversation(Platform::Web, user_id).await;
            println!("Conversation history cleared.\n");
            continue;
        }

        match orchestrator.handle_message(Surface::Web, user_id, input).await {
            Ok(reply) => {
                println!("\n{}\n", reply.response);
                if let Some(usage) = reply.usage {
                    println!("\x1b[90m[{} tokens]\x1b[0m\n", usage.total_tokens);
                }
            }
            Err(e) => eprintln!("\nError: {}\n", e),
        }
    }

    Ok(())
}

fn list_tools() {
    let registry = default_registry(&ToolsConfig::from_env());

    println!("Tools:");
    for (name, available) in registry.availability() {
        let mark = if available { "✓" } else { "✗ (no API key)" };
        println!("  {:<20} {}", name, mark);
    }
}

async fn run_tool(name: &str, raw_args: &str) -> Result<()> {
    let registry = default_registry(&ToolsConfig::from_env());
    let args: serde_json::Value =
        serde_json::from_str(raw_args).context("--args must be a JSON object")?;

    let output = registry.execute(name, args).await?;
    println!("{}", output);
    Ok(())
}
