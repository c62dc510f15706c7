//! Cosmos DB client implementation
//!
//! Databases, containers, plain item writes and reads, and single-partition
//! queries go through the `azure_data_cosmos` SDK. Everything the SDK does
//! not expose is sent over the [`RestChannel`](super::rest::RestChannel).

use super::rest::{
    classify_status, RequestKind, RestChannel, HEADER_ACTIVITY_ID, HEADER_REQUEST_CHARGE,
};
use crate::adapters::store::{DocumentStore, FeedPage};
use crate::client::ConnectionSettings;
use crate::domain::{
    CollectionDefinition, CollectionRef, DatabaseId, DatabaseInfo, Document, FeedOptions,
    PartitionKey, PartitionKeyDefinition, RequestOptions, ResourceResponse, Result, SamplesError,
    SqlQuerySpec, StoreError, StoredProcedure, StoredProcedureResponse, Trigger,
};
use async_trait::async_trait;
use azure_core::credentials::Secret;
use azure_core::error::ErrorKind;
use azure_core::http::headers::{HeaderName, Headers};
use azure_data_cosmos::clients::ContainerClient;
use azure_data_cosmos::models::ContainerProperties;
use azure_data_cosmos::{CosmosClient, CosmosClientOptions, Query};
use futures::stream::{BoxStream, StreamExt};
use regex::Regex;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

const REQUEST_CHARGE: HeaderName = HeaderName::from_static(HEADER_REQUEST_CHARGE);
const ACTIVITY_ID: HeaderName = HeaderName::from_static(HEADER_ACTIVITY_ID);

/// Query used to check that the account answers
const ACCOUNT_QUERY: &str = "SELECT * FROM root";

/// Status names as they appear in SDK error messages
const STATUS_NAMES: [(u16, &str); 9] = [
    (400, "BadRequest"),
    (401, "Unauthorized"),
    (403, "Forbidden"),
    (404, "NotFound"),
    (408, "RequestTimeout"),
    (409, "Conflict"),
    (412, "PreconditionFailed"),
    (429, "TooManyRequests"),
    (503, "ServiceUnavailable"),
];

/// HTTP status carried by an SDK error message, by name or by code
fn http_status(message: &str) -> Option<u16> {
    if let Some((code, _)) = STATUS_NAMES.iter().find(|(_, name)| message.contains(name)) {
        return Some(*code);
    }
    let code = Regex::new(r"\b([1-5]\d\d)\b").ok()?;
    code.captures(message)?.get(1)?.as_str().parse().ok()
}

/// Maps an SDK error to a store error
fn sdk_error(error: azure_core::Error, kind: RequestKind) -> SamplesError {
    let message = error.to_string();
    let mapped = match error.kind() {
        ErrorKind::HttpResponse { .. } => match http_status(&message) {
            Some(status) => classify_status(status, kind, message, None),
            None => StoreError::Service { status: 0, message },
        },
        _ => StoreError::ConnectionFailed(message),
    };
    SamplesError::Store(mapped)
}

/// Request charge and activity id of a response
fn response_meta(headers: &Headers) -> (f64, Option<String>) {
    let request_charge = headers
        .get_optional_str(&REQUEST_CHARGE)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or_default();
    let activity_id = headers.get_optional_str(&ACTIVITY_ID).map(str::to_string);
    (request_charge, activity_id)
}

/// Re-reads one serde model as another with the same wire shape
fn convert<S: Serialize, T: DeserializeOwned>(value: &S) -> Result<T> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|e| {
            SamplesError::Store(StoreError::InvalidResponse(format!(
                "Unexpected resource shape: {e}"
            )))
        })
}

/// SDK partition key for a string value
///
/// The SDK path is only taken for string keys; other values and
/// `Undefined` go over REST.
fn sdk_partition_key(key: &PartitionKey) -> Option<azure_data_cosmos::PartitionKey> {
    match key {
        PartitionKey::Value(Value::String(value)) => {
            Some(azure_data_cosmos::PartitionKey::from(value.clone()))
        }
        _ => None,
    }
}

fn sdk_query(spec: &SqlQuerySpec) -> Result<Query> {
    spec.parameters
        .iter()
        .try_fold(Query::from(spec.query.clone()), |query, parameter| {
            query
                .with_parameter(parameter.name.clone(), parameter.value.clone())
                .map_err(|e| {
                    SamplesError::Store(StoreError::QueryFailed(format!(
                        "Invalid query parameter {}: {e}",
                        parameter.name
                    )))
                })
        })
}

/// Container properties for a definition the SDK model can carry
///
/// `None` for collections without a partition key or with a policy the
/// SDK model rejects.
fn container_properties(definition: &CollectionDefinition) -> Option<ContainerProperties> {
    definition.partition_key.as_ref()?;
    let body = serde_json::to_value(definition).ok()?;
    serde_json::from_value(body).ok()
}

/// Cosmos DB SQL API backend
///
/// # Example
///
/// ```no_run
/// use cosmos_samples::adapters::cosmosdb::CosmosDbStore;
/// use cosmos_samples::adapters::store::DocumentStore;
/// use cosmos_samples::client::ConnectionSettings;
/// use cosmos_samples::config::secret_string;
///
/// # async fn example() -> cosmos_samples::domain::Result<()> {
/// let settings = ConnectionSettings::new(
///     "https://localhost:8081/",
///     secret_string("C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==".to_string()),
/// );
/// let store = CosmosDbStore::new(&settings)?;
/// store.test_connection().await?;
/// # Ok(())
/// # }
/// ```
pub struct CosmosDbStore {
    client: CosmosClient,
    rest: RestChannel,
    partition_keys: Mutex<HashMap<String, Option<PartitionKeyDefinition>>>,
}

impl CosmosDbStore {
    /// Creates the SDK client and the REST channel
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparseable endpoint, a key that
    /// is not base64, or a client that cannot be built.
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        let rest = RestChannel::new(settings)?;

        let key = Secret::new(settings.key.expose_secret().as_str().to_string());
        let options = Some(CosmosClientOptions::default());
        let client = CosmosClient::with_key(rest.endpoint().as_str(), key, options).map_err(|e| {
            SamplesError::Configuration(format!("Failed to create Cosmos client: {e}"))
        })?;

        Ok(Self {
            client,
            rest,
            partition_keys: Mutex::new(HashMap::new()),
        })
    }

    fn container(&self, collection: &CollectionRef) -> ContainerClient {
        self.client
            .database_client(collection.database().as_str())
            .container_client(collection.collection().as_str())
    }

    fn remember_partition_key(&self, link: String, definition: Option<PartitionKeyDefinition>) {
        self.partition_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(link, definition);
    }

    /// Partition key definition of a collection, read once and cached
    async fn partition_key_definition(
        &self,
        collection: &CollectionRef,
    ) -> Result<Option<PartitionKeyDefinition>> {
        let link = collection.link();
        let cached = self
            .partition_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&link)
            .cloned();
        if let Some(definition) = cached {
            return Ok(definition);
        }

        let definition = self.read_collection(collection).await?.resource.partition_key;
        self.remember_partition_key(link, definition.clone());
        Ok(definition)
    }
}

#[async_trait]
impl DocumentStore for CosmosDbStore {
    fn backend_name(&self) -> &'static str {
        "cosmosdb"
    }

    async fn test_connection(&self) -> Result<()> {
        let pager = self
            .client
            .query_databases(ACCOUNT_QUERY.to_string(), None)
            .map_err(|e| {
                SamplesError::Store(StoreError::ConnectionFailed(format!(
                    "Connection test failed: {e}"
                )))
            })?;
        let mut pages = Box::pin(pager.into_pages());
        if let Some(Err(e)) = pages.next().await {
            return Err(SamplesError::Store(StoreError::ConnectionFailed(format!(
                "Connection test failed: {e}"
            ))));
        }
        Ok(())
    }

    async fn create_database(&self, id: &DatabaseId) -> Result<ResourceResponse<DatabaseInfo>> {
        let response = self
            .client
            .create_database(id.as_str(), None)
            .await
            .map_err(|e| sdk_error(e, RequestKind::Other))?;
        let (request_charge, activity_id) = response_meta(response.headers());

        tracing::info!(database = %id, "Database created");
        Ok(ResourceResponse::new(
            DatabaseInfo::new(id.clone()),
            request_charge,
            activity_id,
        ))
    }

    async fn delete_database(&self, id: &DatabaseId) -> Result<ResourceResponse<()>> {
        let response = self
            .client
            .database_client(id.as_str())
            .delete(None)
            .await
            .map_err(|e| sdk_error(e, RequestKind::Other))?;
        let (request_charge, activity_id) = response_meta(response.headers());
        Ok(ResourceResponse::new((), request_charge, activity_id))
    }

    async fn query_databases(&self, query: &SqlQuerySpec) -> Result<FeedPage<DatabaseInfo>> {
        let pager = self
            .client
            .query_databases(sdk_query(query)?, None)
            .map_err(|e| sdk_error(e, RequestKind::Query))?;
        let mut pages = Box::pin(pager.into_pages());

        let Some(page) = pages.next().await else {
            return Ok(FeedPage {
                items: Vec::new(),
                request_charge: 0.0,
                continuation: None,
                activity_id: None,
            });
        };
        let page = page.map_err(|e| sdk_error(e, RequestKind::Query))?;
        let (request_charge, activity_id) = response_meta(page.headers());
        let continuation = page.continuation().map(str::to_string);
        let items = page
            .into_items()
            .iter()
            .map(convert)
            .collect::<Result<Vec<DatabaseInfo>>>()?;

        Ok(FeedPage {
            items,
            request_charge,
            continuation,
            activity_id,
        })
    }

    async fn create_collection(
        &self,
        database: &DatabaseId,
        definition: &CollectionDefinition,
    ) -> Result<ResourceResponse<CollectionDefinition>> {
        let link = CollectionRef::new(database.clone(), definition.id.clone()).link();

        let Some(properties) = container_properties(definition) else {
            tracing::debug!(
                collection = %link,
                "Collection definition not expressible as SDK container properties, using REST"
            );
            let created = self.rest.create_collection(database, definition).await?;
            self.remember_partition_key(link, created.resource.partition_key.clone());
            return Ok(created);
        };

        let response = self
            .client
            .database_client(database.as_str())
            .create_container(properties, None)
            .await
            .map_err(|e| sdk_error(e, RequestKind::Other))?;
        let (request_charge, activity_id) = response_meta(response.headers());

        self.remember_partition_key(link, definition.partition_key.clone());
        Ok(ResourceResponse::new(
            definition.clone(),
            request_charge,
            activity_id,
        ))
    }

    async fn read_collection(
        &self,
        collection: &CollectionRef,
    ) -> Result<ResourceResponse<CollectionDefinition>> {
        let response = self
            .container(collection)
            .read(None)
            .await
            .map_err(|e| sdk_error(e, RequestKind::Other))?;
        let (request_charge, activity_id) = response_meta(response.headers());
        let properties = response.into_body().map_err(|e| {
            SamplesError::Store(StoreError::InvalidResponse(format!(
                "Failed to deserialize collection {collection}: {e}"
            )))
        })?;
        let definition = convert::<_, CollectionDefinition>(&properties)?;
        Ok(ResourceResponse::new(definition, request_charge, activity_id))
    }

    async fn query_documents(
        &self,
        collection: &CollectionRef,
        query: &SqlQuerySpec,
        options: &FeedOptions,
        continuation: Option<&str>,
    ) -> Result<FeedPage<Document>> {
        self.rest
            .query_documents(collection, query, options, continuation)
            .await
    }

    fn open_document_query(
        &self,
        collection: &CollectionRef,
        query: &SqlQuerySpec,
        options: &FeedOptions,
    ) -> Result<Option<BoxStream<'static, Result<FeedPage<Document>>>>> {
        let Some(partition_key) = options.partition_key.as_ref().and_then(sdk_partition_key)
        else {
            return Ok(None);
        };
        if options.enable_scan_in_query {
            return Ok(None);
        }

        let pager = self
            .container(collection)
            .query_items::<Document>(sdk_query(query)?, partition_key, None)
            .map_err(|e| sdk_error(e, RequestKind::Query))?;
        let pages = pager
            .into_pages()
            .map(|page| -> Result<FeedPage<Document>> {
                let page = page.map_err(|e| sdk_error(e, RequestKind::Query))?;
                let (request_charge, activity_id) = response_meta(page.headers());
                let continuation = page.continuation().map(str::to_string);
                Ok(FeedPage {
                    items: page.into_items(),
                    request_charge,
                    continuation,
                    activity_id,
                })
            })
            .boxed();
        Ok(Some(pages))
    }

    async fn create_document(
        &self,
        collection: &CollectionRef,
        document: Document,
        options: &RequestOptions,
    ) -> Result<ResourceResponse<Document>> {
        let partition_key = match &options.partition_key {
            Some(key) => Some(key.clone()),
            None => self
                .partition_key_definition(collection)
                .await?
                .map(|definition| document.partition_key(Some(&definition))),
        };

        let plain_write = options.indexing_directive.as_header_value().is_none()
            && options.pre_triggers.is_empty()
            && options.post_triggers.is_empty();
        let sdk_key = partition_key.as_ref().and_then(sdk_partition_key);

        match sdk_key {
            Some(key) if plain_write => {
                let response = self
                    .container(collection)
                    .create_item(key, &document, None)
                    .await
                    .map_err(|e| sdk_error(e, RequestKind::Other))?;
                let (request_charge, activity_id) = response_meta(response.headers());
                Ok(ResourceResponse::new(document, request_charge, activity_id))
            }
            _ => {
                self.rest
                    .create_document(collection, &document, partition_key.as_ref(), options)
                    .await
            }
        }
    }

    async fn read_document(
        &self,
        collection: &CollectionRef,
        id: &str,
        partition_key: &PartitionKey,
    ) -> Result<ResourceResponse<Document>> {
        let Some(key) = sdk_partition_key(partition_key) else {
            return self.rest.read_document(collection, id, partition_key).await;
        };

        let response = self
            .container(collection)
            .read_item::<Document>(key, id, None)
            .await
            .map_err(|e| sdk_error(e, RequestKind::Other))?;
        let (request_charge, activity_id) = response_meta(response.headers());
        let document = response.into_body().map_err(|e| {
            SamplesError::Store(StoreError::InvalidResponse(format!(
                "Failed to deserialize document {id}: {e}"
            )))
        })?;
        Ok(ResourceResponse::new(document, request_charge, activity_id))
    }

    async fn create_stored_procedure(
        &self,
        collection: &CollectionRef,
        procedure: &StoredProcedure,
    ) -> Result<ResourceResponse<StoredProcedure>> {
        self.rest.create_stored_procedure(collection, procedure).await
    }

    async fn delete_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>> {
        self.rest.delete_stored_procedure(collection, id).await
    }

    async fn execute_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
        args: &[Value],
        options: &RequestOptions,
    ) -> Result<StoredProcedureResponse> {
        self.rest
            .execute_stored_procedure(collection, id, args, options)
            .await
    }

    async fn create_trigger(
        &self,
        collection: &CollectionRef,
        trigger: &Trigger,
    ) -> Result<ResourceResponse<Trigger>> {
        self.rest.create_trigger(collection, trigger).await
    }

    async fn delete_trigger(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>> {
        self.rest.delete_trigger(collection, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("HttpResponse(Conflict, Some(\"Conflict\"))" => Some(409); "conflict by name")]
    #[test_case("request failed with status 429" => Some(429); "throttled by code")]
    #[test_case("HttpResponse(NotFound, None)" => Some(404); "not found")]
    #[test_case("connection refused" => None; "transport error")]
    fn test_http_status(message: &str) -> Option<u16> {
        http_status(message)
    }

    #[test]
    fn test_only_string_keys_use_the_sdk() {
        assert!(sdk_partition_key(&PartitionKey::from("Device001")).is_some());
        assert!(sdk_partition_key(&PartitionKey::from(json!(7))).is_none());
        assert!(sdk_partition_key(&PartitionKey::Undefined).is_none());
    }

    #[test]
    fn test_container_properties_need_a_partition_key() {
        let unpartitioned = CollectionDefinition::named("customers").unwrap();
        assert!(container_properties(&unpartitioned).is_none());
    }

    #[test]
    fn test_store_name() {
        let settings = ConnectionSettings::new(
            "https://localhost:8081/",
            secret_string("dGVzdC1rZXk=".to_string()),
        );
        let store = CosmosDbStore::new(&settings).unwrap();
        assert_eq!(store.backend_name(), "cosmosdb");
    }
}
