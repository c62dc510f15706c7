// Cosmos Samples - Document Store Client Samples
// Copyright (c) 2025 Cosmos Samples Contributors
// Licensed under the MIT License

use clap::Parser;
use cosmos_samples::cli::commands::EXIT_FATAL;
use cosmos_samples::cli::{Cli, Commands};
use cosmos_samples::config::{load_config, LoggingConfig};
use cosmos_samples::logging::init_logging;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Sample commands log to file when the configuration asks for it;
    // init and validate-config stay console-only
    let (config_level, logging_config) = match &cli.command {
        Commands::Query(_) | Commands::Index(_) | Commands::Scripts(_) => {
            match load_config(&cli.config) {
                Ok(config) => (Some(config.application.log_level), config.logging),
                Err(_) => (None, LoggingConfig::default()),
            }
        }
        Commands::ValidateConfig(_) | Commands::Init(_) => (None, LoggingConfig::default()),
    };
    let log_level = cli
        .log_level
        .clone()
        .or(config_level)
        .unwrap_or_else(|| "info".to_string());

    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Cosmos Samples - document store client samples"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            EXIT_FATAL
        }
    };

    // process::exit skips destructors; flush file logs first
    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Query(args) => args.execute(&cli.config).await,
        Commands::Index(args) => args.execute(&cli.config).await,
        Commands::Scripts(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
