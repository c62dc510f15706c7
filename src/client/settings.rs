//! Connection settings
//!
//! Everything needed to open a connection: where, with which key, at which
//! consistency level, and the query defaults applied when a caller passes
//! no feed options.

use crate::config::{SamplesConfig, SecretString, StoreBackend, MEMORY_ENDPOINT_SCHEME};
use crate::domain::{ConsistencyLevel, FeedOptions};
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for [`DocumentStoreClient::connect`](crate::client::DocumentStoreClient::connect)
///
/// # Examples
///
/// ```
/// use cosmos_samples::client::ConnectionSettings;
/// use cosmos_samples::config::{secret_string, StoreBackend};
/// use cosmos_samples::domain::ConsistencyLevel;
///
/// let settings = ConnectionSettings::new("memory://local", secret_string(String::new()))
///     .with_consistency_level(ConsistencyLevel::Eventual);
/// assert_eq!(settings.effective_backend(), StoreBackend::Memory);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Account endpoint, e.g. `https://localhost:8081/` or `memory://local`
    pub endpoint: String,

    /// Base64 master key
    pub key: SecretString,

    pub consistency_level: ConsistencyLevel,

    /// Backend requested by configuration
    pub backend: StoreBackend,

    pub request_timeout: Duration,

    pub tls_verify: bool,

    /// Applied to queries that pass no options of their own
    pub default_feed_options: FeedOptions,
}

impl ConnectionSettings {
    /// Settings with session consistency and default query options
    pub fn new(endpoint: impl Into<String>, key: SecretString) -> Self {
        Self {
            endpoint: endpoint.into(),
            key,
            consistency_level: ConsistencyLevel::default(),
            backend: StoreBackend::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tls_verify: true,
            default_feed_options: FeedOptions::default(),
        }
    }

    /// Builds settings from the `[store]` and `[query]` sections
    pub fn from_config(config: &SamplesConfig) -> Self {
        let store = &config.store;
        Self {
            endpoint: store.endpoint.clone(),
            key: store.key.clone(),
            consistency_level: store.consistency_level,
            backend: store.backend,
            request_timeout: Duration::from_secs(store.request_timeout_seconds),
            tls_verify: store.tls_verify,
            default_feed_options: FeedOptions::default()
                .with_max_item_count(config.query.max_item_count)
                .with_cross_partition(config.query.enable_cross_partition_query),
        }
    }

    pub fn with_consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = level;
        self
    }

    pub fn with_default_feed_options(mut self, options: FeedOptions) -> Self {
        self.default_feed_options = options;
        self
    }

    /// The backend in effect: a `memory://` endpoint always selects the emulator
    pub fn effective_backend(&self) -> StoreBackend {
        if self.endpoint.starts_with(MEMORY_ENDPOINT_SCHEME) {
            StoreBackend::Memory
        } else {
            self.backend
        }
    }
}
