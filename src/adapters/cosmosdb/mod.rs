//! Azure Cosmos DB integration
//!
//! The store is built on the `azure_data_cosmos` SDK. Requests the SDK does
//! not expose travel over a signed REST channel.

pub mod auth;
pub mod client;
pub mod models;
mod rest;

pub use client::CosmosDbStore;
pub use rest::API_VERSION;
