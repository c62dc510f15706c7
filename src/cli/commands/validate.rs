//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the samples configuration file.

use super::{EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// [`load_config`] already validates, so any failure is reported as a
    /// configuration error.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Backend: {:?}", config.store.effective_backend());
        println!("  Endpoint: {}", config.store.endpoint);
        println!("  Consistency Level: {:?}", config.store.consistency_level);
        println!("  Page Size: {}", config.query.max_item_count);
        println!(
            "  Cross-Partition Queries: {}",
            config.query.enable_cross_partition_query
        );
        println!(
            "  Query Collection: {}/{}",
            config.samples.query_database, config.samples.query_collection
        );
        println!("  Index Database: {}", config.samples.index_database);
        println!(
            "  Scripts Collection: {}/{} (partition key {})",
            config.samples.scripts_database,
            config.samples.scripts_collection,
            config.samples.scripts_partition_key
        );
        println!();
        Ok(EXIT_SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file() {
        let code = ValidateArgs {}
            .execute("/nonexistent/cosmos-samples.toml")
            .await
            .unwrap();
        assert_eq!(code, EXIT_CONFIG_ERROR);
    }

    #[tokio::test]
    async fn test_validate_memory_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[store]\nendpoint = \"memory://local\"").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, EXIT_SUCCESS);
    }
}
