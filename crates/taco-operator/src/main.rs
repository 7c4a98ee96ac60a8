//! Taco Operator - reconciling controller for declarative taco orders
//!
//! The operator provides:
//! - REST API for applying orders and secrets
//! - Controller that drives each order through search, placement and delivery
//! - Manifest loading at startup

use clap::Parser;
use std::path::PathBuf;
use taco_operator::{OperatorConfig, OperatorError, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Taco Operator CLI
#[derive(Parser)]
#[command(name = "taco-operator")]
#[command(about = "Taco Operator - reconciles TacoOrder resources against MealMe", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TACO_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "TACO_LISTEN_ADDR")]
    listen: Option<String>,

    /// Manifest file or directory to apply at startup
    #[arg(short, long, env = "TACO_MANIFESTS")]
    manifests: Option<PathBuf>,

    /// MealMe API token
    #[arg(long, env = "MEALME_API_TOKEN", hide_env_values = true)]
    mealme_token: Option<String>,

    /// Log level, overrides the configuration file
    #[arg(long, env = "TACO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "TACO_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), OperatorError> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = OperatorConfig::load(cli.config.as_deref())
        .map_err(|e| OperatorError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| OperatorError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(manifests) = cli.manifests {
        config.storage.manifests = Some(manifests);
    }
    if let Some(token) = cli.mealme_token {
        config.fulfillment.api_token = token;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        workers = config.controller.max_concurrent_reconciles,
        "Starting taco operator"
    );

    let server = Server::new(config)?;
    server.run().await
}
