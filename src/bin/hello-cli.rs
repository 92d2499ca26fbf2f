use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use hello_mesh::client::{DisplayState, Fetcher};
use hello_mesh::config::{default_config, load_config, ConfigError, MeshConfig};
use hello_mesh::deploy;
use hello_mesh::observability::logging::{init_logging, resolve_filter};
use hello_mesh::registry::ServiceRegistry;

#[derive(Parser)]
#[command(name = "hello-cli")]
#[command(about = "Operator CLI for the hello-mesh deployment", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults are used when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one client session and print the settled display state
    Fetch {
        /// Backend address; overrides the configured one
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Print the deployment descriptors as YAML
    Manifests,
    /// Validate a configuration file
    Check,
}

fn load(path: Option<&PathBuf>) -> Result<MeshConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => default_config(),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(
        &resolve_filter(None, std::env::var("RUST_LOG").ok(), "warn"),
        Default::default(),
    );

    match cli.command {
        Commands::Fetch { url } => {
            let mut config = load(cli.config.as_ref())?;
            if let Some(url) = url {
                config.client.backend_url = url;
            }
            let registry = Arc::new(ServiceRegistry::from_config(&config.services));
            let session = Fetcher::new(&config, registry)?.on_init();
            let state = session.settled().await;

            println!("{}", serde_json::to_string_pretty(&state.view())?);
            Ok(match state {
                DisplayState::Success(_) => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            })
        }
        Commands::Manifests => {
            let config = load(cli.config.as_ref())?;
            print!("{}", deploy::render(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => match load(cli.config.as_ref()) {
            Ok(_) => {
                println!("configuration is valid");
                Ok(ExitCode::SUCCESS)
            }
            Err(ConfigError::Validation(errors)) => {
                for error in errors {
                    eprintln!("error: {}", error);
                }
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e.into()),
        },
    }
}
