//! Document store client facade
//!
//! Client lifecycle, request-charge-aware paging and asynchronous document
//! creation over any [`DocumentStore`](crate::adapters::store::DocumentStore)
//! backend.
//!
//! ```text
//! DocumentStoreClient::connect ──► Connection ──► query() ──► QueryPager (Stream of ResultPage)
//!                                       │
//!                                       ├──► create_document().await
//!                                       ├──► submit_create_document() ──► PendingWrite::wait()
//!                                       └──► close()  (idempotent, terminal)
//! ```

pub mod connection;
pub mod pager;
pub mod pending;
pub mod settings;

pub use connection::{Connection, DocumentStoreClient};
pub use pager::QueryPager;
pub use pending::PendingWrite;
pub use settings::{ConnectionSettings, DEFAULT_REQUEST_TIMEOUT};
