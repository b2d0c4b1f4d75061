//! # KozaTakip - Sericulture Telemetry Orchestrator
//!
//! The main binary: HTTP API for the agents and the dashboard, plus a CLI
//! over the same message log.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   apps/koza (THE BINARY)                 │
//! │                                                          │
//! │   ┌─────────────┐                  ┌─────────────┐       │
//! │   │    CLI      │                  │  HTTP API   │       │
//! │   │   (clap)    │                  │   (axum)    │       │
//! │   └──────┬──────┘                  └──────┬──────┘       │
//! │          └───────────────┬────────────────┘              │
//! │                          ▼                               │
//! │                  ┌───────────────┐                       │
//! │                  │   koza-core   │                       │
//! │                  │  (THE LOGIC)  │                       │
//! │                  └───────────────┘                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server with a device config
//! koza -c koza.toml server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! koza snapshot
//! koza ingest -f reports.json
//! koza quality -f frame.json
//! ```

use clap::Parser;
use koza::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // KOZA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("KOZA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "koza=info,koza_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    // JSON output must stay parseable.
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the KozaTakip startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗  ██╗ ██████╗ ███████╗ █████╗
  ██║ ██╔╝██╔═══██╗╚══███╔╝██╔══██╗
  █████╔╝ ██║   ██║  ███╔╝ ███████║
  ██╔═██╗ ██║   ██║ ███╔╝  ██╔══██║
  ██║  ██╗╚██████╔╝███████╗██║  ██║
  ╚═╝  ╚═╝ ╚═════╝ ╚══════╝╚═╝  ╚═╝

  KozaTakip Orchestrator v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
