//! Document store abstraction traits
//!
//! This module defines the trait that every backend implements. One method
//! maps to one remote call; paging, retries and lifecycle live in the client
//! facade, not here.

use crate::domain::{
    CollectionDefinition, CollectionRef, DatabaseId, DatabaseInfo, Document, FeedOptions,
    PartitionKey, RequestOptions, ResourceResponse, Result, SqlQuerySpec, StoredProcedure,
    StoredProcedureResponse, Trigger,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

/// One raw page of a query feed as returned by a backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage<T> {
    /// Items in result order
    pub items: Vec<T>,

    /// Request units charged for this page
    pub request_charge: f64,

    /// Token for the next page; `None` on the last page
    pub continuation: Option<String>,

    /// Service-assigned request id
    pub activity_id: Option<String>,
}

/// Document store trait
///
/// Implemented by the Cosmos DB backend and the in-memory emulator.
/// All methods are independent network calls and may be issued concurrently.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs
    fn backend_name(&self) -> &'static str;

    /// Verifies that the endpoint is reachable and the credentials are accepted
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` when the store cannot be reached
    /// or rejects the credentials.
    async fn test_connection(&self) -> Result<()>;

    /// Creates a database
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteConflict` if the database already exists.
    async fn create_database(&self, id: &DatabaseId) -> Result<ResourceResponse<DatabaseInfo>>;

    /// Deletes a database and everything in it
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the database does not exist.
    async fn delete_database(&self, id: &DatabaseId) -> Result<ResourceResponse<()>>;

    /// Runs a query over the databases of the account (single page)
    async fn query_databases(&self, query: &SqlQuerySpec) -> Result<FeedPage<DatabaseInfo>>;

    /// Creates a collection inside a database
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteConflict` if the collection already exists
    /// and `StoreError::NotFound` if the database does not.
    async fn create_collection(
        &self,
        database: &DatabaseId,
        definition: &CollectionDefinition,
    ) -> Result<ResourceResponse<CollectionDefinition>>;

    /// Reads a collection definition
    async fn read_collection(
        &self,
        collection: &CollectionRef,
    ) -> Result<ResourceResponse<CollectionDefinition>>;

    /// Fetches one page of a document query
    ///
    /// `continuation` is `None` for the first page and the previous page's
    /// token afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::QueryFailed` for malformed queries or a missing
    /// collection.
    async fn query_documents(
        &self,
        collection: &CollectionRef,
        query: &SqlQuerySpec,
        options: &FeedOptions,
        continuation: Option<&str>,
    ) -> Result<FeedPage<Document>>;

    /// Opens a document query whose pages the backend follows by itself
    ///
    /// Returns `Ok(None)` when the backend pages through
    /// [`query_documents`](DocumentStore::query_documents) instead. Nothing
    /// is sent until the stream is polled.
    fn open_document_query(
        &self,
        _collection: &CollectionRef,
        _query: &SqlQuerySpec,
        _options: &FeedOptions,
    ) -> Result<Option<BoxStream<'static, Result<FeedPage<Document>>>>> {
        Ok(None)
    }

    /// Creates a document
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteConflict` if a document with the same `id`
    /// exists in the partition and `StoreError::Validation` if the document
    /// is rejected as invalid.
    async fn create_document(
        &self,
        collection: &CollectionRef,
        document: Document,
        options: &RequestOptions,
    ) -> Result<ResourceResponse<Document>>;

    /// Reads a document by id
    async fn read_document(
        &self,
        collection: &CollectionRef,
        id: &str,
        partition_key: &PartitionKey,
    ) -> Result<ResourceResponse<Document>>;

    /// Registers a stored procedure
    async fn create_stored_procedure(
        &self,
        collection: &CollectionRef,
        procedure: &StoredProcedure,
    ) -> Result<ResourceResponse<StoredProcedure>>;

    /// Removes a stored procedure
    async fn delete_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>>;

    /// Executes a stored procedure with positional JSON arguments
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ScriptFailed` when the script throws or cannot run.
    async fn execute_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
        args: &[Value],
        options: &RequestOptions,
    ) -> Result<StoredProcedureResponse>;

    /// Registers a trigger
    async fn create_trigger(
        &self,
        collection: &CollectionRef,
        trigger: &Trigger,
    ) -> Result<ResourceResponse<Trigger>>;

    /// Removes a trigger
    async fn delete_trigger(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>>;
}
