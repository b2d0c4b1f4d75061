//! # KozaTakip CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `snapshot` - Show the fused dashboard status (default)
//! - `messages` - List stored reports
//! - `audit` - List recorded actuator switches
//! - `ingest` - Ingest reports from a JSON file
//! - `stability` - Score the recent environment
//! - `quality` - Score a vision payload from a JSON file
//! - `stage` - Show the stage currently in force
//! - `config-init` - Write the default device configuration

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use koza_core::KozaError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// KozaTakip - sericulture telemetry orchestrator
///
/// Collects reports from the environment, vision, predictive and quality
/// agents and turns them into one operational status.
#[derive(Parser, Debug)]
#[command(name = "koza")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the message database (redb backend)
    #[arg(short = 'D', long, global = true, default_value = "koza.redb")]
    pub database: PathBuf,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum, default_value_t = Backend::Redb)]
    pub backend: Backend,

    /// Path to the device configuration (TOML)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Message-log backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// In-memory, lost on exit
    Memory,
    /// redb database file
    Redb,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show the dashboard snapshot
    Snapshot,

    /// List stored reports, newest first
    Messages {
        /// Only this agent (environment, vision, predictive_ai, quality)
        #[arg(short, long)]
        agent: Option<String>,

        /// Maximum number of reports
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// List recorded actuator switches, newest first
    Audit {
        /// Only this actuator (ventilation, lighting, heater, humidifier)
        #[arg(short, long)]
        actuator: Option<String>,

        /// Maximum number of entries
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Ingest reports from a JSON file (one report or an array)
    Ingest {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Score the stability of the recent environment
    Stability {
        /// Number of recent environment reports
        #[arg(short, long, default_value = "60")]
        limit: usize,
    },

    /// Score a vision payload against the current stability
    Quality {
        /// Path to the vision JSON payload
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show the stage currently in force
    Stage,

    /// Write the default device configuration to --config (or koza.toml)
    ConfigInit {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), KozaError> {
    let ctx = Context {
        database: cli.database,
        backend: cli.backend,
        config: cli.config,
        json_mode: cli.json_mode,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&ctx, &host, port).await,
        Some(Commands::Snapshot) | None => cmd_snapshot(&ctx),
        Some(Commands::Messages { agent, limit }) => cmd_messages(&ctx, agent.as_deref(), limit),
        Some(Commands::Audit { actuator, limit }) => cmd_audit(&ctx, actuator.as_deref(), limit),
        Some(Commands::Ingest { file }) => cmd_ingest(&ctx, &file),
        Some(Commands::Stability { limit }) => cmd_stability(&ctx, limit),
        Some(Commands::Quality { file }) => cmd_quality(&ctx, &file),
        Some(Commands::Stage) => cmd_stage(&ctx),
        Some(Commands::ConfigInit { force }) => cmd_config_init(&ctx, force),
    }
}
