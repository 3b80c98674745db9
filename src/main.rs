//! Sightline - Main Server
//!
//! Google sign-in and session token service.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sightline::{auth::refresh::hash_token, Config};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sightline")]
#[command(about = "Sign-in and session token server")]
struct Cli {
    /// Path to the YAML config file (defaults to ./config.yaml)
    #[arg(short, long, global = true, env = "SIGHTLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config.yaml and SERVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load and validate the configuration, then print it with secrets redacted
    CheckConfig,

    /// Print the stored hash of a raw refresh token
    HashToken {
        /// Raw refresh token as handed to the client
        raw: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sightline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;
            if let Some(port) = port {
                config.server_port = port;
            }
            sightline::start_server(config).await
        }
        Commands::CheckConfig => {
            let config = Config::from_yaml_and_env(cli.config.as_deref())?;
            print_config(&config);
            Ok(())
        }
        Commands::HashToken { raw } => {
            println!("{}", hash_token(&raw));
            Ok(())
        }
    }
}

fn redact(secret: &str) -> String {
    format!("<{} bytes>", secret.len())
}

fn print_config(config: &Config) {
    println!("Configuration OK");
    println!("  server.port                    {}", config.server_port);
    println!("  auth.google_client_id          {}", config.auth.google_client_id);
    println!("  auth.access_secret             {}", redact(&config.auth.access_secret));
    println!("  auth.refresh_secret            {}", redact(&config.auth.refresh_secret));
    println!("  auth.access_token_expiry_secs  {}", config.auth.access_token_expiry_secs);
    println!("  auth.refresh_token_expiry_secs {}", config.auth.refresh_token_expiry_secs);
    match config.auth.step_timeout_secs {
        Some(secs) => println!("  auth.step_timeout_secs         {}", secs),
        None => println!("  auth.step_timeout_secs         none"),
    }
    println!("  retention.sweep_interval_secs  {}", config.retention.sweep_interval_secs);
    println!("  retention.revoked_retention_secs {}", config.retention.revoked_retention_secs);
}
