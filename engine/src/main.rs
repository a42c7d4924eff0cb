// Finchat engine
// Main entry point for the finchat binary

use clap::Parser;
use finchat_engine::cli::{Cli, Command};
use finchat_engine::config::Config;
use finchat_engine::handlers::{handle_chat, handle_serve, handle_threads, OutputFormat};
use finchat_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    tracing::info!("Finchat engine v{}", env!("CARGO_PKG_VERSION"));

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with config-driven log level
    // (only takes effect if RUST_LOG env var is not set)
    init_telemetry_with_level(&config.core.log_level);

    match cli.command {
        Command::Serve => {
            tracing::info!("Starting API server...");
            handle_serve(&config).await
        }

        Command::Chat { thread, message } => handle_chat(thread, &message, &config, format).await,

        Command::Threads { user } => handle_threads(&user, &config, format).await,
    }
}
