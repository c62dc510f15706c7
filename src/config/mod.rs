//! Configuration management for the samples.
//!
//! TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `COSMOS_SAMPLES_*` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cosmos_samples::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("cosmos-samples.toml")?;
//! println!("Endpoint: {}", config.store.endpoint);
//! println!("Page size: {}", config.query.max_item_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`StoreConfig`] - Backend, endpoint, master key, consistency level
//! - [`QueryConfig`] - Default page size and cross-partition flag
//! - [`SamplesSection`] - Database and collection names used by the samples
//! - [`LoggingConfig`] - File logging
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "development"
//!
//! [application]
//! log_level = "info"
//!
//! [store]
//! backend = "cosmosdb"
//! endpoint = "https://your-account.documents.azure.com:443/"
//! key = "${COSMOS_SAMPLES_MASTER_KEY}"
//! consistency_level = "Session"
//!
//! [query]
//! max_item_count = 500
//! enable_cross_partition_query = true
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config, ENV_PREFIX};
pub use schema::{
    ApplicationConfig, Environment, LoggingConfig, QueryConfig, SamplesConfig, SamplesSection,
    StoreBackend, StoreConfig, MEMORY_ENDPOINT_SCHEME,
};
pub use secret::{secret_string, SecretString, SecretValue};
