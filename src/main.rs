//! scopecrawl: a scoped, polite, deduplicating web crawler

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scopecrawl::config::{Config, LogFormat, LoggingConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scopecrawl")]
#[command(about = "Scoped, polite, deduplicating web crawler")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults are used if it does not exist)
    #[arg(short, long, default_value = "scopecrawl.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from the configured seeds until the frontier is exhausted
    Crawl {
        /// Seed URLs (replace the configured seeds)
        seeds: Vec<String>,

        /// Number of workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the scope decision for URLs (no network access)
    Check {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Write the default configuration file
    Init {
        /// Output file
        #[arg(default_value = "scopecrawl.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Crawl {
            seeds,
            workers,
            json,
        } => commands::crawl::run_crawl(config, seeds, workers, json).await,
        Commands::Check { urls } => commands::check::check_urls(&config, &urls),
        Commands::Init { path, force } => commands::init::init_config(&path, force),
    }
}

fn init_logging(logging: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = logging.level.more_verbose(verbose);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
