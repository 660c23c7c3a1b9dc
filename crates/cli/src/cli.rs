//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Mocap Player - real-time skeletal pose playback
#[derive(Parser, Debug)]
#[command(
    name = "mocap-player",
    author,
    version,
    about = "Real-time skeletal motion capture player",
    long_about = "Plays skeletal motion capture streams onto avatars.\n\n\
                  Builds each avatar's skeleton from its source definition, buffers \n\
                  jittery frames, and renders smoothed poses at a steady rate."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MOCAP_PLAYER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MOCAP_PLAYER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the playback session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration and skeleton layout information
    Info(InfoArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Validate(_) => "validate",
            Self::Info(_) => "info",
        }
    }

    /// Session file the command reads.
    pub fn config_path(&self) -> &Path {
        match self {
            Self::Run(args) => &args.config,
            Self::Validate(args) => &args.config,
            Self::Info(args) => &args.config,
        }
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "session.toml", env = "MOCAP_PLAYER_CONFIG")]
    pub config: PathBuf,

    /// Override the render rate from configuration (ticks per second)
    #[arg(long, env = "MOCAP_PLAYER_FPS")]
    pub fps: Option<f64>,

    /// Maximum number of render ticks (0 = unlimited)
    #[arg(long, default_value = "0", env = "MOCAP_PLAYER_MAX_TICKS")]
    pub max_ticks: u64,

    /// Frames each source sends before finishing (0 = stream forever)
    #[arg(long, default_value = "0", env = "MOCAP_PLAYER_FRAMES")]
    pub frames: u64,

    /// Session timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "MOCAP_PLAYER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Override the ingestion queue capacity
    #[arg(long, env = "MOCAP_PLAYER_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MOCAP_PLAYER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the bone table with humanoid roles and mirror pairs
    #[arg(long)]
    pub bones: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
