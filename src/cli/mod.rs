//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the samples using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Cosmos Samples - document store client samples
#[derive(Parser, Debug)]
#[command(name = "cosmos-samples")]
#[command(version, about, long_about = None)]
#[command(author = "Cosmos Samples Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "cosmos-samples.toml", env = "COSMOS_SAMPLES_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "COSMOS_SAMPLES_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sample queries and report request charges
    Query(commands::query::QueryArgs),

    /// Run the index management demos
    Index(commands::index::IndexArgs),

    /// Run the stored procedure and trigger demos
    Scripts(commands::scripts::ScriptsArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
