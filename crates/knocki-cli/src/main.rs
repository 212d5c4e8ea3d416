//! Knocki command line client
//!
//! Logs in, links the Home Assistant integration, lists triggers and
//! prints events pushed over the WebSocket.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "knocki", version, about = "Client for the Knocki cloud API")]
struct Cli {
    /// Directory holding knocki.yaml and secrets.yaml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Config file name, relative to the config directory
    #[arg(long, default_value = knocki_config::DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange email and password for a token
    Login {
        /// Overrides `email` from the config
        #[arg(long)]
        email: Option<String>,
        /// Overrides `password` from the config
        #[arg(long)]
        password: Option<String>,
    },
    /// Register the Home Assistant integration with the account
    Link,
    /// Remove the Home Assistant integration from the account
    Unlink,
    /// List configured triggers
    Triggers,
    /// Print events until interrupted
    Listen,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = knocki_config::KnockiConfig::load(&cli.config_dir, &cli.config_file)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::login(&config, email, password).await?;
        }
        Commands::Link => commands::link(&config).await?,
        Commands::Unlink => commands::unlink(&config).await?,
        Commands::Triggers => commands::triggers(&config).await?,
        Commands::Listen => commands::listen(&config).await?,
    }

    Ok(())
}
