//! Raw REST channel
//!
//! Carries the requests the SDK client does not expose: server-side
//! scripts, writes with an indexing directive or trigger includes, paged
//! queries resumed from a caller-held continuation token, and collections
//! the SDK container model cannot describe. Each method is exactly one HTTP
//! request; nothing is retried.

use super::auth::{http_date, MasterKeySigner};
use super::models::{DocumentsFeed, ErrorBody};
use crate::adapters::store::FeedPage;
use crate::client::ConnectionSettings;
use crate::domain::{
    CollectionDefinition, CollectionRef, ConsistencyLevel, DatabaseId, Document, FeedOptions,
    PartitionKey, RequestOptions, ResourceResponse, Result, SamplesError, SqlQuerySpec,
    StoreError, StoredProcedure, StoredProcedureResponse, Trigger,
};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// REST API version sent with every request
pub const API_VERSION: &str = "2018-12-31";

const HEADER_DATE: &str = "x-ms-date";
const HEADER_VERSION: &str = "x-ms-version";
const HEADER_CONSISTENCY: &str = "x-ms-consistency-level";
const HEADER_IS_QUERY: &str = "x-ms-documentdb-isquery";
const HEADER_MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
const HEADER_CROSS_PARTITION: &str = "x-ms-documentdb-query-enablecrosspartition";
const HEADER_PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
const HEADER_ENABLE_SCAN: &str = "x-ms-documentdb-query-enable-scan";
const HEADER_CONTINUATION: &str = "x-ms-continuation";
const HEADER_INDEXING_DIRECTIVE: &str = "x-ms-indexing-directive";
const HEADER_PRE_TRIGGERS: &str = "x-ms-documentdb-pre-trigger-include";
const HEADER_POST_TRIGGERS: &str = "x-ms-documentdb-post-trigger-include";
pub(crate) const HEADER_REQUEST_CHARGE: &str = "x-ms-request-charge";
pub(crate) const HEADER_ACTIVITY_ID: &str = "x-ms-activity-id";
const HEADER_RETRY_AFTER: &str = "x-ms-retry-after-ms";

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_QUERY: &str = "application/query+json";

/// What a request does, for mapping failure statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Query,
    Script,
    Other,
}

/// Maps a non-success status to a store error
pub(crate) fn classify_status(
    status: u16,
    kind: RequestKind,
    message: String,
    retry_after: Option<String>,
) -> StoreError {
    match (status, kind) {
        (400, RequestKind::Query) | (404, RequestKind::Query) => StoreError::QueryFailed(message),
        (400, RequestKind::Script) => StoreError::ScriptFailed(message),
        (400, _) => StoreError::Validation(message),
        (401, _) | (403, _) => StoreError::ConnectionFailed(message),
        (404, _) => StoreError::NotFound(message),
        (409, _) => StoreError::WriteConflict(message),
        (429, _) => StoreError::Throttled(retry_after.unwrap_or_else(|| "unknown".to_string())),
        (code, _) => StoreError::Service {
            status: code,
            message,
        },
    }
}

/// Raw successful response
struct RestResponse {
    body: String,
    request_charge: f64,
    activity_id: Option<String>,
    continuation: Option<String>,
}

impl RestResponse {
    fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            SamplesError::Store(StoreError::InvalidResponse(format!(
                "Failed to parse response body: {e}"
            )))
        })
    }

    fn into_response<T>(self, resource: T) -> ResourceResponse<T> {
        ResourceResponse::new(resource, self.request_charge, self.activity_id)
    }
}

/// One request against a resource
///
/// `path` is the URL path relative to the endpoint; `resource_type` and
/// `resource_link` are what gets signed.
struct Call<'a> {
    method: Method,
    path: String,
    resource_type: &'a str,
    resource_link: String,
    kind: RequestKind,
}

impl<'a> Call<'a> {
    fn new(method: Method, resource_type: &'a str, path: String, resource_link: String) -> Self {
        Self {
            method,
            path,
            resource_type,
            resource_link,
            kind: RequestKind::Other,
        }
    }

    fn kind(mut self, kind: RequestKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Signed HTTP access to the SQL API
pub(crate) struct RestChannel {
    base_url: Url,
    client: Client,
    signer: MasterKeySigner,
    consistency_level: ConsistencyLevel,
}

impl RestChannel {
    /// Creates the HTTP client and decodes the master key
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparseable endpoint, a key that
    /// is not base64, or an HTTP client that cannot be built.
    pub(crate) fn new(settings: &ConnectionSettings) -> Result<Self> {
        let mut endpoint = settings.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let base_url = Url::parse(&endpoint).map_err(|e| {
            SamplesError::Configuration(format!("Invalid endpoint '{}': {e}", settings.endpoint))
        })?;

        let signer = MasterKeySigner::new(settings.key.expose_secret().as_str())?;

        let mut builder = ClientBuilder::new()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(30));
        if !settings.tls_verify {
            tracing::warn!("TLS certificate verification is disabled for script requests");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(|e| {
            SamplesError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            client,
            signer,
            consistency_level: settings.consistency_level,
        })
    }

    /// Endpoint with a trailing slash
    pub(crate) fn endpoint(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, call: &Call<'_>) -> Result<RequestBuilder> {
        let url = self.base_url.join(&call.path).map_err(|e| {
            SamplesError::Store(StoreError::Validation(format!(
                "Invalid resource path '{}': {e}",
                call.path
            )))
        })?;
        let date = http_date(chrono::Utc::now());
        let authorization = self.signer.authorization(
            call.method.as_str(),
            call.resource_type,
            &call.resource_link,
            &date,
        )?;

        Ok(self
            .client
            .request(call.method.clone(), url)
            .header("authorization", authorization)
            .header(HEADER_DATE, date)
            .header(HEADER_VERSION, API_VERSION)
            .header(HEADER_CONSISTENCY, self.consistency_level.as_header_value())
            .header("accept", CONTENT_TYPE_JSON))
    }

    async fn execute(&self, call: &Call<'_>, request: RequestBuilder) -> Result<RestResponse> {
        let response = request.send().await.map_err(|e| {
            SamplesError::Store(StoreError::ConnectionFailed(format!(
                "{} {} failed: {e}",
                call.method, call.path
            )))
        })?;

        let status = response.status();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let request_charge = header(HEADER_REQUEST_CHARGE)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or_default();
        let activity_id = header(HEADER_ACTIVITY_ID);
        let continuation = header(HEADER_CONTINUATION).filter(|c| !c.is_empty());
        let retry_after = header(HEADER_RETRY_AFTER);

        let body = response.text().await.map_err(|e| {
            SamplesError::Store(StoreError::InvalidResponse(format!(
                "Failed to read response body: {e}"
            )))
        })?;

        tracing::debug!(
            method = %call.method,
            path = %call.path,
            status = status.as_u16(),
            request_charge = request_charge,
            activity_id = activity_id.as_deref().unwrap_or(""),
            "Cosmos DB REST request completed"
        );

        if !status.is_success() {
            let message = ErrorBody::describe(&body);
            return Err(classify_status(status.as_u16(), call.kind, message, retry_after).into());
        }

        Ok(RestResponse {
            body,
            request_charge,
            activity_id,
            continuation,
        })
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        call: &Call<'_>,
        body: &B,
    ) -> Result<RestResponse> {
        let payload = serde_json::to_string(body)?;
        let request = self
            .request(call)?
            .header("content-type", CONTENT_TYPE_JSON)
            .body(payload);
        self.execute(call, request).await
    }

    async fn send_empty(&self, call: &Call<'_>) -> Result<RestResponse> {
        let request = self.request(call)?;
        self.execute(call, request).await
    }

    fn resource_call<'a>(method: Method, resource_type: &'a str, link: String) -> Call<'a> {
        Call::new(method, resource_type, link.clone(), link)
    }

    fn feed_call<'a>(method: Method, resource_type: &'a str, parent: String) -> Call<'a> {
        let path = if parent.is_empty() {
            resource_type.to_string()
        } else {
            format!("{parent}/{resource_type}")
        };
        Call::new(method, resource_type, path, parent)
    }

    pub(crate) async fn create_collection(
        &self,
        database: &DatabaseId,
        definition: &CollectionDefinition,
    ) -> Result<ResourceResponse<CollectionDefinition>> {
        let call = Self::feed_call(Method::POST, "colls", database.link());
        let response = self.send_json(&call, definition).await?;
        let created = response.json::<CollectionDefinition>()?;
        Ok(response.into_response(created))
    }

    /// Fetches one page, resuming from `continuation` when given
    pub(crate) async fn query_documents(
        &self,
        collection: &CollectionRef,
        query: &SqlQuerySpec,
        options: &FeedOptions,
        continuation: Option<&str>,
    ) -> Result<FeedPage<Document>> {
        let call =
            Self::feed_call(Method::POST, "docs", collection.link()).kind(RequestKind::Query);
        let payload = serde_json::to_string(query)?;
        let mut request = self
            .request(&call)?
            .header(HEADER_IS_QUERY, "True")
            .header("content-type", CONTENT_TYPE_QUERY)
            .header(
                HEADER_CROSS_PARTITION,
                if options.enable_cross_partition_query {
                    "True"
                } else {
                    "False"
                },
            )
            .body(payload);
        if let Some(count) = options.max_item_count {
            request = request.header(HEADER_MAX_ITEM_COUNT, count.to_string());
        }
        if let Some(key) = &options.partition_key {
            request = request.header(HEADER_PARTITION_KEY, key.header_value());
        }
        if options.enable_scan_in_query {
            request = request.header(HEADER_ENABLE_SCAN, "True");
        }
        if let Some(token) = continuation {
            request = request.header(HEADER_CONTINUATION, token);
        }

        let response = self.execute(&call, request).await?;
        let feed = response.json::<DocumentsFeed>()?;
        Ok(FeedPage {
            items: feed.documents,
            request_charge: response.request_charge,
            continuation: response.continuation,
            activity_id: response.activity_id,
        })
    }

    /// Creates a document with every request option sent as a header
    pub(crate) async fn create_document(
        &self,
        collection: &CollectionRef,
        document: &Document,
        partition_key: Option<&PartitionKey>,
        options: &RequestOptions,
    ) -> Result<ResourceResponse<Document>> {
        let call = Self::feed_call(Method::POST, "docs", collection.link());
        let payload = serde_json::to_string(document)?;
        let mut request = self
            .request(&call)?
            .header("content-type", CONTENT_TYPE_JSON)
            .body(payload);
        if let Some(key) = partition_key {
            request = request.header(HEADER_PARTITION_KEY, key.header_value());
        }
        if let Some(directive) = options.indexing_directive.as_header_value() {
            request = request.header(HEADER_INDEXING_DIRECTIVE, directive);
        }
        if !options.pre_triggers.is_empty() {
            request = request.header(HEADER_PRE_TRIGGERS, options.pre_triggers.join(","));
        }
        if !options.post_triggers.is_empty() {
            request = request.header(HEADER_POST_TRIGGERS, options.post_triggers.join(","));
        }

        let response = self.execute(&call, request).await?;
        let created = response.json::<Document>()?;
        Ok(response.into_response(created))
    }

    pub(crate) async fn read_document(
        &self,
        collection: &CollectionRef,
        id: &str,
        partition_key: &PartitionKey,
    ) -> Result<ResourceResponse<Document>> {
        let call = Self::resource_call(Method::GET, "docs", collection.child_link("docs", id));
        let request = self
            .request(&call)?
            .header(HEADER_PARTITION_KEY, partition_key.header_value());
        let response = self.execute(&call, request).await?;
        let document = response.json::<Document>()?;
        Ok(response.into_response(document))
    }

    pub(crate) async fn create_stored_procedure(
        &self,
        collection: &CollectionRef,
        procedure: &StoredProcedure,
    ) -> Result<ResourceResponse<StoredProcedure>> {
        let call = Self::feed_call(Method::POST, "sprocs", collection.link());
        let response = self.send_json(&call, procedure).await?;
        let created = response.json::<StoredProcedure>()?;
        Ok(response.into_response(created))
    }

    pub(crate) async fn delete_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>> {
        let call =
            Self::resource_call(Method::DELETE, "sprocs", collection.child_link("sprocs", id));
        let response = self.send_empty(&call).await?;
        Ok(response.into_response(()))
    }

    pub(crate) async fn execute_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
        args: &[Value],
        options: &RequestOptions,
    ) -> Result<StoredProcedureResponse> {
        let call = Self::resource_call(Method::POST, "sprocs", collection.child_link("sprocs", id))
            .kind(RequestKind::Script);
        let payload = serde_json::to_string(args)?;
        let mut request = self
            .request(&call)?
            .header("content-type", CONTENT_TYPE_JSON)
            .body(payload);
        if let Some(key) = &options.partition_key {
            request = request.header(HEADER_PARTITION_KEY, key.header_value());
        }

        let response = self.execute(&call, request).await?;
        let value = if response.body.trim().is_empty() {
            Value::Null
        } else {
            response.json::<Value>()?
        };
        Ok(StoredProcedureResponse {
            response: value,
            request_charge: response.request_charge,
            activity_id: response.activity_id,
        })
    }

    pub(crate) async fn create_trigger(
        &self,
        collection: &CollectionRef,
        trigger: &Trigger,
    ) -> Result<ResourceResponse<Trigger>> {
        let call = Self::feed_call(Method::POST, "triggers", collection.link());
        let response = self.send_json(&call, trigger).await?;
        let created = response.json::<Trigger>()?;
        Ok(response.into_response(created))
    }

    pub(crate) async fn delete_trigger(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>> {
        let call = Self::resource_call(
            Method::DELETE,
            "triggers",
            collection.child_link("triggers", id),
        );
        let response = self.send_empty(&call).await?;
        Ok(response.into_response(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use test_case::test_case;

    #[test_case(400, RequestKind::Query => matches StoreError::QueryFailed(_); "bad query")]
    #[test_case(400, RequestKind::Other => matches StoreError::Validation(_); "bad write")]
    #[test_case(400, RequestKind::Script => matches StoreError::ScriptFailed(_); "script error")]
    #[test_case(401, RequestKind::Other => matches StoreError::ConnectionFailed(_); "unauthorized")]
    #[test_case(403, RequestKind::Query => matches StoreError::ConnectionFailed(_); "forbidden")]
    #[test_case(404, RequestKind::Query => matches StoreError::QueryFailed(_); "missing collection")]
    #[test_case(404, RequestKind::Other => matches StoreError::NotFound(_); "missing resource")]
    #[test_case(409, RequestKind::Other => matches StoreError::WriteConflict(_); "conflict")]
    #[test_case(429, RequestKind::Other => matches StoreError::Throttled(_); "throttled")]
    #[test_case(503, RequestKind::Other => matches StoreError::Service { status: 503, .. }; "unavailable")]
    fn test_classify_status(status: u16, kind: RequestKind) -> StoreError {
        classify_status(status, kind, "message".to_string(), None)
    }

    #[test]
    fn test_feed_and_resource_calls() {
        let coll = CollectionRef::from_names("db", "coll").unwrap();

        let call = RestChannel::feed_call(Method::POST, "docs", coll.link());
        assert_eq!(call.path, "dbs/db/colls/coll/docs");
        assert_eq!(call.resource_link, "dbs/db/colls/coll");

        let call = RestChannel::feed_call(Method::POST, "dbs", String::new());
        assert_eq!(call.path, "dbs");
        assert_eq!(call.resource_link, "");

        let call = RestChannel::resource_call(
            Method::DELETE,
            "triggers",
            coll.child_link("triggers", "UpdateMetadata"),
        );
        assert_eq!(call.path, "dbs/db/colls/coll/triggers/UpdateMetadata");
        assert_eq!(call.resource_link, call.path);
    }

    #[test]
    fn test_new_rejects_bad_endpoint() {
        let settings = ConnectionSettings::new("not a url", secret_string("dGVzdC1rZXk=".to_string()));
        assert!(RestChannel::new(&settings).is_err());
    }

    #[test]
    fn test_endpoint_gets_trailing_slash() {
        let settings = ConnectionSettings::new(
            "https://localhost:8081",
            secret_string("dGVzdC1rZXk=".to_string()),
        );
        let channel = RestChannel::new(&settings).unwrap();
        assert_eq!(channel.endpoint().as_str(), "https://localhost:8081/");
    }
}
