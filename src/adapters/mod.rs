//! Document store backends
//!
//! - [`store`] - the `DocumentStore` trait and backend factory
//! - [`cosmosdb`] - Azure Cosmos DB SQL API through the SDK
//! - [`memory`] - in-process emulator for tests and offline runs
//!
//! # Design Pattern
//!
//! Backends follow the **Adapter Pattern**: the client facade only sees
//! `Arc<dyn DocumentStore>`, so tests run the same code paths against the
//! in-memory store that production runs against Cosmos DB.
//!
//! ```rust
//! use cosmos_samples::adapters::store::create_store;
//! use cosmos_samples::client::ConnectionSettings;
//! use cosmos_samples::config::secret_string;
//!
//! let settings = ConnectionSettings::new("memory://local", secret_string(String::new()));
//! let store = create_store(&settings).unwrap();
//! assert_eq!(store.backend_name(), "memory");
//! ```

pub mod cosmosdb;
pub mod memory;
pub mod store;
