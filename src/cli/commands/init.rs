//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{EXIT_CONFIG_ERROR, EXIT_FATAL, EXIT_SUCCESS};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "cosmos-samples.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Cosmos Samples configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG_ERROR);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your account endpoint", self.output);
                println!("  2. Set COSMOS_SAMPLES_KEY in your environment or a .env file");
                println!("     (or use endpoint = \"memory://local\" to run without an account)");
                println!("  3. Validate configuration: cosmos-samples validate-config");
                println!("  4. Run a sample: cosmos-samples query --seed");
                println!();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate the configuration file with comments
    pub fn generate_config() -> String {
        r#"# Cosmos Samples Configuration File

# Runtime environment (development, staging, production)
environment = "development"

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

[store]
# Backend: "cosmosdb" or "memory"
# An endpoint starting with memory:// always selects the in-memory backend.
backend = "cosmosdb"
endpoint = "https://your-account.documents.azure.com:443/"

# Account master key (use environment variable)
key = "${COSMOS_SAMPLES_KEY}"

# Strong, BoundedStaleness, Session, Eventual or ConsistentPrefix
consistency_level = "Session"

# Request timeout in seconds (1-600)
request_timeout_seconds = 60

# Disable only for the local emulator's self-signed certificate
tls_verify = true

[query]
# Maximum documents per result page (1-1000)
max_item_count = 500
enable_cross_partition_query = true

[samples]
query_database = "AzureSampleFamilyDB"
query_collection = "FamilyCollection"
index_database = "IndexManagement"
scripts_database = "ServerSideScripts"
scripts_collection = "jsexamples"
scripts_partition_key = "/DeviceId"

[logging]
# JSON log files in addition to console output
local_enabled = false
local_path = "./logs"

# Log rotation (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}
