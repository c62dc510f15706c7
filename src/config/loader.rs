//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{SamplesConfig, StoreBackend};
use super::secret_string;
use crate::domain::errors::SamplesError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Prefix of environment variables that override configuration values
pub const ENV_PREFIX: &str = "COSMOS_SAMPLES_";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`SamplesConfig`]
/// 4. Applies environment variable overrides (`COSMOS_SAMPLES_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read, a referenced
/// variable is unset, the TOML is malformed or validation fails.
///
/// # Examples
///
/// ```no_run
/// use cosmos_samples::config::load_config;
///
/// let config = load_config("cosmos-samples.toml").expect("Failed to load config");
/// println!("{}", config.store.endpoint);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SamplesConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SamplesError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SamplesError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying the same substitution, overrides and
/// validation as [`load_config`]
pub fn parse_config(contents: &str) -> Result<SamplesConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: SamplesConfig = toml::from_str(&contents)
        .map_err(|e| SamplesError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SamplesError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied unchanged.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SamplesError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SamplesError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}")).ok()
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        SamplesError::Configuration(format!(
            "Invalid value '{value}' for environment override {ENV_PREFIX}{key}"
        ))
    })
}

/// Applies environment variable overrides using the `COSMOS_SAMPLES_` prefix
///
/// Variables follow the pattern `COSMOS_SAMPLES_<SECTION>_<KEY>`, for
/// example `COSMOS_SAMPLES_STORE_ENDPOINT` or `COSMOS_SAMPLES_QUERY_MAX_ITEM_COUNT`.
fn apply_env_overrides(config: &mut SamplesConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env_override("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Store overrides
    if let Some(val) = env_override("STORE_BACKEND") {
        config.store.backend = match val.to_ascii_lowercase().as_str() {
            "cosmosdb" => StoreBackend::CosmosDB,
            "memory" => StoreBackend::Memory,
            _ => {
                return Err(SamplesError::Configuration(format!(
                    "Invalid value '{val}' for {ENV_PREFIX}STORE_BACKEND. Must be one of: cosmosdb, memory"
                )))
            }
        };
    }
    if let Some(val) = env_override("STORE_ENDPOINT") {
        config.store.endpoint = val;
    }
    if let Some(val) = env_override("STORE_KEY") {
        config.store.key = secret_string(val);
    }
    if let Some(val) = env_override("STORE_CONSISTENCY_LEVEL") {
        config.store.consistency_level = val
            .parse()
            .map_err(SamplesError::Configuration)?;
    }
    if let Some(val) = env_override("STORE_REQUEST_TIMEOUT_SECONDS") {
        config.store.request_timeout_seconds =
            parse_override("STORE_REQUEST_TIMEOUT_SECONDS", &val)?;
    }
    if let Some(val) = env_override("STORE_TLS_VERIFY") {
        config.store.tls_verify = parse_override("STORE_TLS_VERIFY", &val)?;
    }

    // Query overrides
    if let Some(val) = env_override("QUERY_MAX_ITEM_COUNT") {
        config.query.max_item_count = parse_override("QUERY_MAX_ITEM_COUNT", &val)?;
    }
    if let Some(val) = env_override("QUERY_ENABLE_CROSS_PARTITION_QUERY") {
        config.query.enable_cross_partition_query =
            parse_override("QUERY_ENABLE_CROSS_PARTITION_QUERY", &val)?;
    }

    // Sample name overrides
    if let Some(val) = env_override("SAMPLES_QUERY_DATABASE") {
        config.samples.query_database = val;
    }
    if let Some(val) = env_override("SAMPLES_QUERY_COLLECTION") {
        config.samples.query_collection = val;
    }

    // Logging overrides
    if let Some(val) = env_override("LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = env_override("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
