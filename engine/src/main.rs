// Gavel judging coordinator
// Main entry point for the gavel binary

use clap::Parser;
use gavel_engine::cli::{Cli, Command};
use gavel_engine::config::Config;
use gavel_engine::handlers::{handle_scores, handle_serve, handle_watch, OutputFormat};
use gavel_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Gavel v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Serve { port } => {
            tracing::info!("Starting session server...");
            handle_serve(config, port).await
        }

        Command::Scores { limit } => handle_scores(limit, &config, format).await,

        Command::Watch { url } => {
            tracing::info!("Watching session at {}", url);
            handle_watch(url, format).await
        }
    }
}
