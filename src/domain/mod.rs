//! Domain models and types for the document-store samples.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`DatabaseId`], [`CollectionId`], [`CollectionRef`])
//! - **Documents and partition keys** ([`Document`], [`PartitionKey`])
//! - **Query and request options** ([`SqlQuerySpec`], [`FeedOptions`], [`RequestOptions`])
//! - **Collection configuration** ([`IndexingPolicy`], [`CollectionDefinition`])
//! - **Server-side script resources** ([`StoredProcedure`], [`Trigger`])
//! - **Error types** ([`SamplesError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers are validated on construction, so a [`CollectionRef`] always
//! renders a well-formed resource link:
//!
//! ```rust
//! use cosmos_samples::domain::{CollectionRef, DatabaseId, CollectionId};
//!
//! # fn example() -> Result<(), String> {
//! let coll = CollectionRef::new(DatabaseId::new("IndexManagement")?, CollectionId::new("coll1")?);
//! assert_eq!(coll.link(), "dbs/IndexManagement/colls/coll1");
//! assert!(DatabaseId::new("bad/name").is_err());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SamplesError>`]; store failures
//! arrive as [`SamplesError::Store`] and can be classified with the helper
//! predicates:
//!
//! ```rust
//! use cosmos_samples::domain::{SamplesError, StoreError};
//!
//! let err: SamplesError = StoreError::WriteConflict("doc1".to_string()).into();
//! assert!(err.is_write_conflict());
//! ```

pub mod document;
pub mod errors;
pub mod ids;
pub mod indexing;
pub mod options;
pub mod query;
pub mod result;
pub mod scripts;

// Re-export commonly used types for convenience
pub use document::{Document, PartitionKey, PartitionKeyDefinition, PartitionKind};
pub use errors::{SamplesError, StoreError};
pub use ids::{CollectionId, CollectionRef, DatabaseId};
pub use indexing::{
    CollectionDefinition, DatabaseInfo, ExcludedPath, IncludedPath, IndexingMode, IndexingPolicy,
};
pub use options::{ConsistencyLevel, IndexingDirective, RequestOptions, ResourceResponse};
pub use query::{FeedOptions, ResultPage, SqlParameter, SqlQuerySpec, DEFAULT_MAX_ITEM_COUNT};
pub use result::Result;
pub use scripts::{
    MetadataAggregate, StoredProcedure, StoredProcedureResponse, Trigger, TriggerOperation,
    TriggerType,
};
