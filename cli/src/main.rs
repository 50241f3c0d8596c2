use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod output;
mod runtime;

use commands::*;
use output::OutputFormat;
use runtime::Runtime;

#[derive(Parser)]
#[command(name = "ragcoord")]
#[command(about = "Command-line interface for the retrieval-reasoning coordinator")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory the global cache tier persists to
    #[arg(long, default_value = runtime::DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    Ask(AskArgs),
    /// Inspect or manage the cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Validate or display the effective configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .init();

    match cli.command {
        Commands::Config { command } => {
            let loaded = config::load_raw_config(cli.config.as_deref())?;
            handle_config_command(command, &loaded, cli.format)
        }
        Commands::Ask(args) => {
            let loaded = config::load_config(cli.config.as_deref())?;
            let runtime = Runtime::build(loaded, cli.cache_dir, args.llm_response.clone()).await?;
            handle_ask_command(args, &runtime, cli.format).await
        }
        Commands::Cache { command } => {
            let loaded = config::load_config(cli.config.as_deref())?;
            let cache_dir_display = cli.cache_dir.display().to_string();
            let runtime = Runtime::build(loaded.clone(), cli.cache_dir, String::new()).await?;
            handle_cache_command(command, &runtime, &loaded, &cache_dir_display, cli.format).await
        }
    }
}
