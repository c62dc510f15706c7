//! Client lifecycle and store operations
//!
//! A [`Connection`] moves from connected to closed exactly once. Every
//! operation checks the state first and fails with
//! `StoreError::ConnectionFailed` once the connection is closed. Pagers and
//! pending writes started before `close` keep their own handle to the
//! backend and run to completion.

use super::pager::QueryPager;
use super::pending::PendingWrite;
use super::settings::ConnectionSettings;
use crate::adapters::store::{create_store, DocumentStore};
use crate::domain::{
    CollectionDefinition, CollectionRef, DatabaseId, DatabaseInfo, Document, FeedOptions,
    PartitionKey, RequestOptions, ResourceResponse, Result, SamplesError, SqlQuerySpec,
    StoreError, StoredProcedure, StoredProcedureResponse, Trigger,
};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Entry point for opening connections
///
/// # Example
///
/// ```
/// use cosmos_samples::client::{ConnectionSettings, DocumentStoreClient};
/// use cosmos_samples::config::secret_string;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let settings = ConnectionSettings::new("memory://local", secret_string(String::new()));
/// let connection = DocumentStoreClient::connect(settings).await.unwrap();
/// assert!(!connection.is_closed());
///
/// connection.close().unwrap();
/// connection.close().unwrap();
/// assert!(connection.is_closed());
/// # });
/// ```
pub struct DocumentStoreClient;

impl DocumentStoreClient {
    /// Builds the configured backend and verifies it answers
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` if the backend cannot be
    /// created (malformed endpoint or key) or the endpoint is unreachable or
    /// rejects the credentials.
    pub async fn connect(settings: ConnectionSettings) -> Result<Connection> {
        let store = create_store(&settings).map_err(|e| match e {
            store_error @ SamplesError::Store(_) => store_error,
            other => SamplesError::Store(StoreError::ConnectionFailed(format!(
                "Failed to create store client for '{}': {other}",
                settings.endpoint
            ))),
        })?;
        Self::connect_with_store(store, settings).await
    }

    /// Wraps an already built backend
    pub async fn connect_with_store(
        store: Arc<dyn DocumentStore>,
        settings: ConnectionSettings,
    ) -> Result<Connection> {
        store.test_connection().await?;
        tracing::info!(
            endpoint = %settings.endpoint,
            backend = store.backend_name(),
            consistency_level = %settings.consistency_level,
            "Connected to document store"
        );
        Ok(Connection {
            backend_name: store.backend_name(),
            store: RwLock::new(Some(store)),
            settings,
        })
    }
}

/// An open session with a document store
pub struct Connection {
    store: RwLock<Option<Arc<dyn DocumentStore>>>,
    backend_name: &'static str,
    settings: ConnectionSettings,
}

async fn create_with(
    store: Arc<dyn DocumentStore>,
    collection: CollectionRef,
    mut document: Document,
    options: RequestOptions,
) -> Result<ResourceResponse<Document>> {
    if options.generate_id && document.id().is_none() {
        document.set_id(Uuid::new_v4().to_string());
    }
    document
        .validate_for_create()
        .map_err(SamplesError::Validation)?;

    let response = store.create_document(&collection, document, &options).await?;
    crate::log_request_charge!(
        "create_document",
        response.request_charge,
        response.activity_id.as_deref()
    );
    Ok(response)
}

impl Connection {
    fn store(&self) -> Result<Arc<dyn DocumentStore>> {
        self.store
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                SamplesError::Store(StoreError::ConnectionFailed(
                    "Connection is closed".to_string(),
                ))
            })
    }

    /// Name of the backend serving this connection
    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn is_closed(&self) -> bool {
        self.store
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Releases the session; calling it again is a no-op
    pub fn close(&self) -> Result<()> {
        let released = self
            .store
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if released.is_some() {
            tracing::info!(endpoint = %self.settings.endpoint, "Connection closed");
        }
        Ok(())
    }

    /// Starts a lazy query
    ///
    /// The connection's default feed options apply when `options` is `None`.
    /// Nothing is sent until the pager is polled; remote failures surface as
    /// an `Err` item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConnectionFailed` on a closed connection and
    /// `StoreError::QueryFailed` for empty query text or malformed parameter
    /// names.
    pub fn query(
        &self,
        collection: &CollectionRef,
        query: SqlQuerySpec,
        options: Option<&FeedOptions>,
    ) -> Result<QueryPager> {
        let store = self.store()?;
        query
            .validate()
            .map_err(|e| SamplesError::Store(StoreError::QueryFailed(e.to_string())))?;
        let options = options
            .cloned()
            .unwrap_or_else(|| self.settings.default_feed_options.clone());

        tracing::debug!(collection = %collection, query = %query.query, "Starting query");
        let pager = match store.open_document_query(collection, &query, &options)? {
            Some(pages) => QueryPager::from_stream(collection.clone(), pages),
            None => QueryPager::new(store, collection.clone(), query, options),
        };
        Ok(pager)
    }

    /// Creates a document and waits for the store to acknowledge it
    ///
    /// With `generate_id` set, a document without `id` gets a random one.
    ///
    /// # Errors
    ///
    /// `StoreError::WriteConflict` if the id already exists in the partition;
    /// `SamplesError::Validation` if `id` is missing or invalid.
    pub async fn create_document(
        &self,
        collection: &CollectionRef,
        document: Document,
        options: Option<&RequestOptions>,
    ) -> Result<ResourceResponse<Document>> {
        let store = self.store()?;
        let options = options.cloned().unwrap_or_default();
        create_with(store, collection.clone(), document, options).await
    }

    /// Submits a document creation without waiting for it
    ///
    /// # Errors
    ///
    /// Fails immediately on a closed connection or outside a tokio runtime;
    /// write failures are reported by [`PendingWrite::wait`].
    pub fn submit_create_document(
        &self,
        collection: &CollectionRef,
        document: Document,
        options: Option<&RequestOptions>,
    ) -> Result<PendingWrite> {
        let store = self.store()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SamplesError::Other(format!("No async runtime to submit on: {e}")))?;
        let options = options.cloned().unwrap_or_default();
        let document_id = document.id().map(str::to_string);
        let handle = runtime.spawn(create_with(store, collection.clone(), document, options));
        Ok(PendingWrite::new(document_id, handle))
    }

    pub async fn read_document(
        &self,
        collection: &CollectionRef,
        id: &str,
        partition_key: &PartitionKey,
    ) -> Result<ResourceResponse<Document>> {
        let response = self
            .store()?
            .read_document(collection, id, partition_key)
            .await?;
        crate::log_request_charge!(
            "read_document",
            response.request_charge,
            response.activity_id.as_deref()
        );
        Ok(response)
    }

    pub async fn create_database(&self, id: &DatabaseId) -> Result<ResourceResponse<DatabaseInfo>> {
        let response = self.store()?.create_database(id).await?;
        tracing::info!(database = %id, request_charge = response.request_charge, "Database created");
        Ok(response)
    }

    pub async fn delete_database(&self, id: &DatabaseId) -> Result<ResourceResponse<()>> {
        let response = self.store()?.delete_database(id).await?;
        tracing::info!(database = %id, request_charge = response.request_charge, "Database deleted");
        Ok(response)
    }

    /// Looks a database up by id
    pub async fn find_database(&self, id: &DatabaseId) -> Result<Option<DatabaseInfo>> {
        let query = SqlQuerySpec::new("SELECT * FROM root r WHERE r.id=@id").with_parameter("@id", id)?;
        let page = self.store()?.query_databases(&query).await?;
        crate::log_request_charge!(
            "query_databases",
            page.request_charge,
            page.activity_id.as_deref()
        );
        Ok(page.items.into_iter().find(|db| &db.id == id))
    }

    /// Deletes the database if it exists; returns whether it did
    pub async fn cleanup_database(&self, id: &DatabaseId) -> Result<bool> {
        match self.find_database(id).await? {
            Some(_) => {
                self.delete_database(id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn create_collection(
        &self,
        database: &DatabaseId,
        definition: &CollectionDefinition,
    ) -> Result<ResourceResponse<CollectionDefinition>> {
        let response = self
            .store()?
            .create_collection(database, definition)
            .await?;
        tracing::info!(
            database = %database,
            collection = %definition.id,
            request_charge = response.request_charge,
            "Collection created"
        );
        Ok(response)
    }

    pub async fn read_collection(
        &self,
        collection: &CollectionRef,
    ) -> Result<ResourceResponse<CollectionDefinition>> {
        self.store()?.read_collection(collection).await
    }

    pub async fn create_stored_procedure(
        &self,
        collection: &CollectionRef,
        procedure: &StoredProcedure,
    ) -> Result<ResourceResponse<StoredProcedure>> {
        let response = self
            .store()?
            .create_stored_procedure(collection, procedure)
            .await?;
        tracing::info!(stored_procedure = %procedure.id, "Stored procedure created");
        Ok(response)
    }

    pub async fn delete_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>> {
        self.store()?.delete_stored_procedure(collection, id).await
    }

    /// Deletes a stored procedure, treating "not found" as success
    ///
    /// Returns whether something was deleted.
    pub async fn try_delete_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<bool> {
        ignore_not_found(self.delete_stored_procedure(collection, id).await)
    }

    pub async fn execute_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
        args: &[Value],
        options: Option<&RequestOptions>,
    ) -> Result<StoredProcedureResponse> {
        let options = options.cloned().unwrap_or_default();
        let response = self
            .store()?
            .execute_stored_procedure(collection, id, args, &options)
            .await?;
        crate::log_request_charge!(
            "execute_stored_procedure",
            response.request_charge,
            response.activity_id.as_deref()
        );
        Ok(response)
    }

    pub async fn create_trigger(
        &self,
        collection: &CollectionRef,
        trigger: &Trigger,
    ) -> Result<ResourceResponse<Trigger>> {
        let response = self.store()?.create_trigger(collection, trigger).await?;
        tracing::info!(trigger = %trigger.id, "Trigger created");
        Ok(response)
    }

    pub async fn delete_trigger(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>> {
        self.store()?.delete_trigger(collection, id).await
    }

    /// Deletes a trigger, treating "not found" as success
    pub async fn try_delete_trigger(&self, collection: &CollectionRef, id: &str) -> Result<bool> {
        ignore_not_found(self.delete_trigger(collection, id).await)
    }
}

fn ignore_not_found(result: Result<ResourceResponse<()>>) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(SamplesError::Store(StoreError::NotFound(_))) => Ok(false),
        Err(e) => Err(e),
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.settings.endpoint)
            .field("backend", &self.backend_name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use serde_json::json;

    async fn connect() -> Connection {
        let settings = ConnectionSettings::new("memory://local", secret_string(String::new()));
        DocumentStoreClient::connect(settings).await.unwrap()
    }

    async fn with_collection(connection: &Connection) -> CollectionRef {
        let db = DatabaseId::new("db").unwrap();
        connection.create_database(&db).await.unwrap();
        let definition = CollectionDefinition::named("coll").unwrap();
        connection.create_collection(&db, &definition).await.unwrap();
        CollectionRef::new(db, definition.id)
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let connection = connect().await;
        let coll = with_collection(&connection).await;
        connection.close().unwrap();

        let err = connection
            .query(&coll, SqlQuerySpec::new("SELECT * FROM c"), None)
            .unwrap_err();
        assert!(err.is_connection_error());

        let doc = Document::from_value(json!({"id": "a"})).unwrap();
        let err = connection.create_document(&coll, doc, None).await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected_locally() {
        let connection = connect().await;
        let coll = with_collection(&connection).await;
        let err = connection
            .query(&coll, SqlQuerySpec::new("  "), None)
            .unwrap_err();
        assert!(err.is_query_error());
    }

    #[tokio::test]
    async fn test_generated_id() {
        let connection = connect().await;
        let coll = with_collection(&connection).await;
        let doc = Document::from_value(json!({"LastName": "Estel"})).unwrap();

        let err = connection
            .create_document(&coll, doc.clone(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SamplesError::Validation(_)));

        let created = connection
            .create_document(&coll, doc, Some(&RequestOptions::default().with_generated_id()))
            .await
            .unwrap();
        let id = created.resource.id().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_submit_and_wait() {
        let connection = connect().await;
        let coll = with_collection(&connection).await;
        let doc = Document::from_value(json!({"id": "async"})).unwrap();

        let pending = connection.submit_create_document(&coll, doc, None).unwrap();
        assert_eq!(pending.document_id(), Some("async"));
        let created = pending.wait().await.unwrap();
        assert_eq!(created.resource.id(), Some("async"));
    }

    #[tokio::test]
    async fn test_cleanup_database() {
        let connection = connect().await;
        let db = DatabaseId::new("IndexManagement").unwrap();
        assert!(!connection.cleanup_database(&db).await.unwrap());
        connection.create_database(&db).await.unwrap();
        assert!(connection.find_database(&db).await.unwrap().is_some());
        assert!(connection.cleanup_database(&db).await.unwrap());
        assert!(connection.find_database(&db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_try_delete_scripts() {
        let connection = connect().await;
        let coll = with_collection(&connection).await;
        assert!(!connection
            .try_delete_stored_procedure(&coll, "SimpleScript")
            .await
            .unwrap());
        connection
            .create_stored_procedure(&coll, &StoredProcedure::new("SimpleScript", "function(){}"))
            .await
            .unwrap();
        assert!(connection
            .try_delete_stored_procedure(&coll, "SimpleScript")
            .await
            .unwrap());
        assert!(!connection.try_delete_trigger(&coll, "UpdateMetadata").await.unwrap());
    }
}
