//! vidcrawl: discovery and extraction pipeline for video listing sites

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vidcrawl::config::{Config, LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(name = "vidcrawl")]
#[command(about = "Discover videos on listing sites and merge them into a JSON catalog")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "vidcrawl.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all configured sites and merge new records into the catalog
    Run {
        /// Catalog file (overrides [catalog].path)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Report what would be added without writing the catalog
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a starter configuration
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show catalog statistics
    Stats {
        /// Catalog file (overrides [catalog].path)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = config.level.raised_by(verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    match config.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { catalog, dry_run } => {
            let config = Config::load(&cli.config)?;
            init_logging(&config.logging, cli.verbose)?;
            commands::run::run_pipeline(config, catalog, dry_run).await
        }
        Commands::Init { path, force } => {
            init_logging(&LoggingConfig::default(), cli.verbose)?;
            commands::init::init_config(path, force)
        }
        Commands::Stats { catalog } => {
            // Stats only needs the catalog path, so a missing config is fine
            let config = if cli.config.exists() {
                Config::load(&cli.config)?
            } else {
                Config::default()
            };
            init_logging(&config.logging, cli.verbose)?;
            commands::stats::show_stats(config, catalog)
        }
    }
}
