//! Query command implementation
//!
//! Runs the request-charge queries against the configured collection.

use super::{
    close_connection, open_connection, report, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_FATAL,
};
use crate::samples::QuerySamples;
use clap::Args;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Create the database, collection and customer documents first
    #[arg(long)]
    pub seed: bool,
}

impl QueryArgs {
    /// Execute the query command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(seed = self.seed, "Running query samples");

        let (config, connection) = match open_connection(config_path).await {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let samples = match QuerySamples::from_config(&connection, &config.samples) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ {e}");
                close_connection(&connection);
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        println!("🔎 Querying {}", samples.collection());
        println!();

        if self.seed {
            match samples.seed().await {
                Ok(created) => println!("Seeded {created} customer document(s)"),
                Err(e) => {
                    println!("❌ Failed to seed {}", samples.collection());
                    println!("   Error: {e}");
                    close_connection(&connection);
                    return Ok(if e.is_connection_error() {
                        EXIT_CONNECTION_ERROR
                    } else {
                        EXIT_FATAL
                    });
                }
            }
        }

        let summary = samples.run().await;
        close_connection(&connection);
        Ok(report(&summary))
    }
}
