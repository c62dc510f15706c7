// Cosmos Samples - Document Store Client Samples
// Copyright (c) 2025 Cosmos Samples Contributors
// Licensed under the MIT License

//! # Cosmos Samples
//!
//! A small asynchronous client for a Cosmos-style document store and three
//! sample suites built on it.
//!
//! ## Overview
//!
//! - **Connecting** to an account endpoint with a master key and a consistency level
//! - **Querying** collections with paged results and per-page request charges
//! - **Writing** documents with indexing directives, generated ids and triggers
//! - **Scripting** with stored procedures and post-triggers
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`samples`] - The query, indexing and scripts sample suites
//! - [`client`] - Connection facade, pagers and pending writes
//! - [`adapters`] - Backends: Cosmos DB REST and the in-memory emulator
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cosmos_samples::client::{ConnectionSettings, DocumentStoreClient};
//! use cosmos_samples::config::load_config;
//! use cosmos_samples::domain::{CollectionRef, SqlQuerySpec};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("cosmos-samples.toml")?;
//!     let connection = DocumentStoreClient::connect(ConnectionSettings::from_config(&config)).await?;
//!
//!     let collection = CollectionRef::from_names("AzureSampleFamilyDB", "FamilyCollection")?;
//!     let mut pages = connection.query(&collection, SqlQuerySpec::new("SELECT * FROM c"), None)?;
//!     while let Some(page) = pages.next().await {
//!         let page = page?;
//!         println!("{} document(s), {} RU", page.len(), page.request_charge);
//!     }
//!
//!     connection.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible call returns [`domain::Result`]; store failures are
//! classified in [`domain::StoreError`]:
//!
//! ```rust
//! use cosmos_samples::domain::{SamplesError, StoreError};
//!
//! let err = SamplesError::Store(StoreError::WriteConflict("doc1".to_string()));
//! assert!(err.is_write_conflict());
//! ```

pub mod adapters;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod logging;
pub mod samples;
