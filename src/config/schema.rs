//! Configuration schema types
//!
//! This module defines the configuration structure for the samples.

use crate::config::{secret_string, SecretString};
use crate::domain::{ConsistencyLevel, DEFAULT_MAX_ITEM_COUNT};
use serde::{Deserialize, Serialize};

/// Endpoint scheme that selects the in-memory backend regardless of `backend`
pub const MEMORY_ENDPOINT_SCHEME: &str = "memory://";

/// Document store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Azure Cosmos DB over its REST API
    #[default]
    CosmosDB,
    /// In-process emulator
    Memory,
}

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main samples configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplesConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Document store connection
    pub store: StoreConfig,

    /// Default query options
    #[serde(default)]
    pub query: QueryConfig,

    /// Database and collection names used by the samples
    #[serde(default)]
    pub samples: SamplesSection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SamplesConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.store.validate(&self.environment)?;
        self.query.validate()?;
        self.samples.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// A configuration that targets the in-memory backend with defaults
    /// everywhere else
    pub fn in_memory() -> Self {
        Self {
            application: ApplicationConfig::default(),
            environment: Environment::Development,
            store: StoreConfig {
                backend: StoreBackend::Memory,
                endpoint: format!("{MEMORY_ENDPOINT_SCHEME}local"),
                key: secret_string(String::new()),
                consistency_level: ConsistencyLevel::Session,
                request_timeout_seconds: default_request_timeout_seconds(),
                tls_verify: true,
            },
            query: QueryConfig::default(),
            samples: SamplesSection::default(),
            logging: LoggingConfig {
                local_enabled: false,
                ..LoggingConfig::default()
            },
        }
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Document store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to talk to (cosmosdb or memory)
    #[serde(default)]
    pub backend: StoreBackend,

    /// Account endpoint, e.g. `https://account.documents.azure.com:443/`
    pub endpoint: String,

    /// Account master key (base64)
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default = "empty_secret")]
    pub key: SecretString,

    /// Consistency level requested for every call
    #[serde(default)]
    pub consistency_level: ConsistencyLevel,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// TLS certificate verification enabled
    ///
    /// Disabling verification is only meant for the local emulator, whose
    /// certificate is self-signed. Rejected in production environments.
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

impl StoreConfig {
    /// The backend in effect: a `memory://` endpoint always selects the emulator
    pub fn effective_backend(&self) -> StoreBackend {
        if self.endpoint.starts_with(MEMORY_ENDPOINT_SCHEME) {
            StoreBackend::Memory
        } else {
            self.backend
        }
    }

    fn validate(&self, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.request_timeout_seconds == 0 || self.request_timeout_seconds > 600 {
            return Err(format!(
                "store.request_timeout_seconds must be between 1 and 600, got {}",
                self.request_timeout_seconds
            ));
        }

        if self.effective_backend() == StoreBackend::Memory {
            return Ok(());
        }

        if self.endpoint.is_empty() {
            return Err("store.endpoint cannot be empty".to_string());
        }

        if !self.endpoint.starts_with("https://") && !self.endpoint.starts_with("http://") {
            return Err("store.endpoint must start with https:// or http://".to_string());
        }

        if url::Url::parse(&self.endpoint).is_err() {
            return Err(format!("store.endpoint '{}' is not a valid URL", self.endpoint));
        }

        if self.key.expose_secret().is_empty() {
            return Err("store.key cannot be empty".to_string());
        }

        if *environment == Environment::Production {
            if !self.endpoint.starts_with("https://") {
                return Err(
                    "store.endpoint must use https:// in production environments".to_string(),
                );
            }
            if !self.tls_verify {
                return Err(
                    "TLS certificate verification cannot be disabled in production environments. \
                    Set 'tls_verify = true', or use 'environment = \"development\"' when talking to the local emulator."
                        .to_string(),
                );
            }
        }

        Ok(())
    }
}

/// Default query options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum documents per result page
    #[serde(default = "default_max_item_count")]
    pub max_item_count: u32,

    /// Allow queries to fan out across partitions
    #[serde(default = "default_true")]
    pub enable_cross_partition_query: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_item_count: default_max_item_count(),
            enable_cross_partition_query: true,
        }
    }
}

impl QueryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_item_count == 0 || self.max_item_count > 1000 {
            return Err(format!(
                "query.max_item_count must be between 1 and 1000, got {}",
                self.max_item_count
            ));
        }
        Ok(())
    }
}

/// Database and collection names used by the samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplesSection {
    /// Database queried by the request-charge sample
    #[serde(default = "default_query_database")]
    pub query_database: String,

    /// Collection queried by the request-charge sample
    #[serde(default = "default_query_collection")]
    pub query_collection: String,

    /// Database created (and recreated) by the indexing sample
    #[serde(default = "default_index_database")]
    pub index_database: String,

    /// Database created (and recreated) by the scripts sample
    #[serde(default = "default_scripts_database")]
    pub scripts_database: String,

    /// Partitioned collection used by the scripts sample
    #[serde(default = "default_scripts_collection")]
    pub scripts_collection: String,

    /// Partition key path of the scripts collection
    #[serde(default = "default_scripts_partition_key")]
    pub scripts_partition_key: String,
}

impl Default for SamplesSection {
    fn default() -> Self {
        Self {
            query_database: default_query_database(),
            query_collection: default_query_collection(),
            index_database: default_index_database(),
            scripts_database: default_scripts_database(),
            scripts_collection: default_scripts_collection(),
            scripts_partition_key: default_scripts_partition_key(),
        }
    }
}

impl SamplesSection {
    fn validate(&self) -> Result<(), String> {
        let names = [
            ("samples.query_database", &self.query_database),
            ("samples.query_collection", &self.query_collection),
            ("samples.index_database", &self.index_database),
            ("samples.scripts_database", &self.scripts_database),
            ("samples.scripts_collection", &self.scripts_collection),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(format!("{field} cannot be empty"));
            }
            if value.contains(['/', '\\', '?', '#']) {
                return Err(format!(
                    "{field} '{value}' cannot contain '/', '\\', '?' or '#'"
                ));
            }
        }

        if !self.scripts_partition_key.starts_with('/') || self.scripts_partition_key.len() < 2 {
            return Err(format!(
                "samples.scripts_partition_key must be a path starting with '/', got '{}'",
                self.scripts_partition_key
            ));
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn empty_secret() -> SecretString {
    secret_string(String::new())
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_max_item_count() -> u32 {
    DEFAULT_MAX_ITEM_COUNT
}

fn default_query_database() -> String {
    "AzureSampleFamilyDB".to_string()
}

fn default_query_collection() -> String {
    "FamilyCollection".to_string()
}

fn default_index_database() -> String {
    "IndexManagement".to_string()
}

fn default_scripts_database() -> String {
    "ServerSideScripts".to_string()
}

fn default_scripts_collection() -> String {
    "jsexamples".to_string()
}

fn default_scripts_partition_key() -> String {
    "/DeviceId".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosmos_store() -> StoreConfig {
        StoreConfig {
            backend: StoreBackend::CosmosDB,
            endpoint: "https://myaccount.documents.azure.com:443/".to_string(),
            key: secret_string("dGVzdC1rZXk=".to_string()),
            consistency_level: ConsistencyLevel::Session,
            request_timeout_seconds: 60,
            tls_verify: true,
        }
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig {
            log_level: "info".to_string(),
        };

        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_config_validation() {
        let mut config = cosmos_store();
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Production).is_ok());

        config.key = secret_string(String::new());
        assert!(config.validate(&Environment::Development).is_err());

        config = cosmos_store();
        config.endpoint = "ftp://myaccount".to_string();
        assert!(config.validate(&Environment::Development).is_err());

        config = cosmos_store();
        config.request_timeout_seconds = 0;
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_store_tls_verification_in_production() {
        let mut config = cosmos_store();
        config.tls_verify = false;

        let result = config.validate(&Environment::Production);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .contains("TLS certificate verification cannot be disabled in production"));

        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Staging).is_ok());

        config.tls_verify = true;
        config.endpoint = "http://localhost:8081/".to_string();
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Production).is_err());
    }

    #[test]
    fn test_memory_endpoint_selects_memory_backend() {
        let mut config = cosmos_store();
        config.endpoint = "memory://local".to_string();
        config.key = secret_string(String::new());
        assert_eq!(config.effective_backend(), StoreBackend::Memory);
        assert!(config.validate(&Environment::Production).is_ok());
    }

    #[test]
    fn test_query_config_validation() {
        let mut config = QueryConfig::default();
        assert_eq!(config.max_item_count, 500);
        assert!(config.enable_cross_partition_query);
        assert!(config.validate().is_ok());

        config.max_item_count = 0;
        assert!(config.validate().is_err());

        config.max_item_count = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_samples_section_validation() {
        let mut config = SamplesSection::default();
        assert!(config.validate().is_ok());

        config.index_database = "bad/name".to_string();
        assert!(config.validate().is_err());

        config = SamplesSection::default();
        config.scripts_collection = " ".to_string();
        assert!(config.validate().is_err());

        config = SamplesSection::default();
        config.scripts_partition_key = "DeviceId".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.local_enabled);
        assert_eq!(config.local_path, "./logs");
        assert_eq!(config.local_rotation, "daily");
        assert!(config.validate().is_ok());

        let config = LoggingConfig {
            local_rotation: "size".to_string(),
            ..LoggingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_in_memory_config_is_valid() {
        let config = SamplesConfig::in_memory();
        assert_eq!(config.store.effective_backend(), StoreBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_max_item_count(), 500);
        assert_eq!(default_query_database(), "AzureSampleFamilyDB");
        assert_eq!(default_query_collection(), "FamilyCollection");
        assert_eq!(default_index_database(), "IndexManagement");
        assert_eq!(default_scripts_database(), "ServerSideScripts");
        assert_eq!(default_scripts_collection(), "jsexamples");
        assert_eq!(default_scripts_partition_key(), "/DeviceId");
    }
}
