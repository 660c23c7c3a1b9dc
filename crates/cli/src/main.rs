//! # Mocap Player CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Session configuration loading and validation
//! - Render loop orchestration over motion sources
//! - Graceful shutdown handling

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = cli.command.name(),
        config = %cli.command.config_path().display(),
        "Mocap player starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        error!(command = cli.command.name(), error = %e, "Command failed");
    }

    result
}

/// Map `-v`/`-q` and `--log-format` onto the observability config
fn init_logging(cli: &Cli) -> Result<()> {
    let config =
        ObservabilityConfig::from_verbosity(cli.verbose, cli.quiet).with_format(cli.log_format.into());
    observability::init_with_config(config)
}
