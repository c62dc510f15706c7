//! In-memory document store
//!
//! Selected with a `memory://` endpoint. Useful for running the samples
//! without an account and as the test double for the client facade.

pub mod query;
pub mod store;

pub use store::MemoryStore;
