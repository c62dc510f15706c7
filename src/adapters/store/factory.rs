//! Document store factory
//!
//! Builds the backend selected by the connection settings.

use crate::adapters::cosmosdb::CosmosDbStore;
use crate::adapters::memory::MemoryStore;
use crate::adapters::store::traits::DocumentStore;
use crate::client::ConnectionSettings;
use crate::config::StoreBackend;
use crate::domain::Result;
use std::sync::Arc;

/// Create a document store based on the connection settings
///
/// A `memory://` endpoint always selects the in-memory backend.
///
/// # Errors
///
/// Returns an error if the backend cannot be created, e.g. for an invalid
/// endpoint URL or a master key that is not base64.
pub fn create_store(settings: &ConnectionSettings) -> Result<Arc<dyn DocumentStore>> {
    match settings.effective_backend() {
        StoreBackend::CosmosDB => {
            tracing::info!(endpoint = %settings.endpoint, "Creating Cosmos DB store");
            let store = CosmosDbStore::new(settings)?;
            Ok(Arc::new(store) as Arc<dyn DocumentStore>)
        }
        StoreBackend::Memory => {
            tracing::info!(endpoint = %settings.endpoint, "Creating in-memory store");
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>)
        }
    }
}
