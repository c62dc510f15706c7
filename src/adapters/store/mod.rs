//! Document store abstraction layer
//!
//! A trait-based seam between the client facade and the concrete backends
//! (Cosmos DB REST, in-memory).

pub mod factory;
pub mod traits;

pub use factory::create_store;
pub use traits::{DocumentStore, FeedPage};
