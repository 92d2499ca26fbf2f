//! hello-mesh server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser ──▶ node port ──▶ ┌──────────────┐      ┌──────────────────┐
//!                             │   frontend   │      │       api        │
//!                             │ /  /state    │      │ any path, method │
//!                             │ /static      │      │  → greeting      │
//!                             │              │      │  + CORS headers  │
//!                             │ client ──────┼─GET─▶│                  │
//!                             │  (once)      │      └──────────────────┘
//!                             │ registry ────┼── go-api-service:8080
//!                             │ + health     │      → healthy instance
//!                             └──────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use hello_mesh::config::{default_config, load_config};
use hello_mesh::lifecycle::{run_api, run_frontend, Shutdown};
use hello_mesh::observability::logging::{init_logging, resolve_filter};

#[derive(Parser)]
#[command(name = "hello-mesh", version)]
#[command(about = "Backend responder and front-end for the hello-mesh deployment", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults are used when absent)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "hello_mesh=debug"; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// Run the backend responder
    Api,
    /// Run the front-end and its client session
    Frontend,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    let filter = resolve_filter(
        cli.log_level,
        std::env::var("RUST_LOG").ok(),
        &config.observability.log_level,
    );
    init_logging(&filter, config.observability.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hello-mesh starting");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    match cli.role {
        Role::Api => run_api(config, &shutdown).await?,
        Role::Frontend => run_frontend(config, &shutdown).await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
