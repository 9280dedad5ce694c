// Ensemble task orchestrator
// Main entry point for the ensemble binary

use clap::Parser;
use ensemble_engine::cli::{Cli, Command};
use ensemble_engine::config::Config;
use ensemble_engine::handlers::{handle_capabilities, handle_plan, handle_run, OutputFormat};
use ensemble_engine::telemetry::init_telemetry_with_level;

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

    // --log overrides the configured level; RUST_LOG overrides both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Ensemble v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Run { task } => {
            tracing::info!("Executing task: {}", task);
            handle_run(task, &config, format).await
        }

        Command::Plan { task } => {
            tracing::info!("Planning task: {}", task);
            handle_plan(task, &config, format).await
        }

        Command::Capabilities => handle_capabilities(&config, format).await,
    }
}
