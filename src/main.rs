//! madabank-net - Authenticated API client CLI
//!
#![doc = "madabank-net - Authenticated API client CLI"]
#![doc = "Main entry point for the madabank-net command-line tool."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use madabank_net::cli::{Cli, Commands};
use madabank_net::commands;
use madabank_net::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(config, email, password).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::auth::logout(config).await?;
            Ok(())
        }
        Commands::Status => {
            commands::auth::status(config).await?;
            Ok(())
        }
        Commands::Refresh => {
            tracing::info!("Forcing token refresh");
            commands::auth::refresh(config).await?;
            Ok(())
        }
        Commands::Get { path, query } => {
            tracing::debug!("GET {} ({} query parameters)", path, query.len());
            commands::request::get(config, path, query).await?;
            Ok(())
        }
        Commands::Post { path, data } => {
            tracing::debug!("POST {}", path);
            commands::request::post(config, path, data).await?;
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, json_logs: bool) {
    let default_level = if verbose {
        "madabank_net=debug"
    } else {
        "madabank_net=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
