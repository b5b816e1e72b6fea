//! filechat CLI - Chat with a language model through a plain-text transcript.
//!
//! Two modes of operation:
//! - **Chat**: `filechat <path>` sends the transcript and streams the reply into the file
//! - **Tools**: Subcommands like `format`, `view` and `validate` work on a file without a model

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "filechat")]
#[command(author, version, about = "Chat with a language model through a plain-text transcript file", long_about = None)]
struct Cli {
    /// Transcript file to continue
    path: Option<PathBuf>,

    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GlobalArgs {
    /// Config file (defaults to ./config.yaml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model to request (overrides the config file)
    #[arg(long, global = true)]
    model: Option<String>,

    /// API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true, env = "OPENAI_API_URL")]
    base_url: Option<String>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize heading spacing in a transcript
    Format {
        /// Path to the transcript
        path: PathBuf,
    },

    /// Print a parsed transcript
    View {
        /// Path to the transcript
        path: PathBuf,

        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,
    },

    /// Check whether a transcript is ready to send
    Validate {
        /// Path to the transcript
        path: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{}", format!("Error: {:#}", err).red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Format { path }) => commands::format::run(&path),
        Some(Commands::View { path, json }) => commands::view::run(&path, json),
        Some(Commands::Validate { path }) => commands::validate::run(&path),
        None => {
            let Some(path) = cli.path else {
                Cli::command().print_help()?;
                return Ok(());
            };

            let GlobalArgs {
                config,
                model,
                api_key,
                base_url,
                ..
            } = cli.global;
            let mut app_config = AppConfig::load(config.as_deref())?;
            app_config.apply_overrides(model, api_key, base_url);
            commands::chat::run(&path, &app_config).await
        }
    }
}
