//! Integration tests for the Cosmos DB backend against a mock server
//!
//! Database, container, item and single-partition query calls go through the
//! SDK; scripts, trigger writes and cross-partition queries go over REST.

use cosmos_samples::client::{Connection, ConnectionSettings, DocumentStoreClient};
use cosmos_samples::config::secret_string;
use cosmos_samples::domain::{
    CollectionRef, Document, FeedOptions, PartitionKey, RequestOptions, SamplesError, SqlQuerySpec,
    StoreError,
};
use futures::StreamExt;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

const TEST_KEY: &str = "dGVzdC1rZXk=";

const SIGNED: &str = r"^type%3Dmaster%26ver%3D1\.0%26sig%3D.+$";

const DEVICE_COLLECTION: &str = r#"{"id":"coll","_rid":"cGFydA==","_self":"dbs/ZGI=/colls/cGFydA==/","_etag":"\"0\"","_ts":1700000000,"partitionKey":{"paths":["/DeviceId"],"kind":"Hash"}}"#;

fn settings(server: &ServerGuard) -> ConnectionSettings {
    ConnectionSettings::new(server.url(), secret_string(TEST_KEY.to_string()))
}

/// Account read some SDK versions issue before the first request
async fn mock_account_properties(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"test-account","writableLocations":[],"readableLocations":[]}"#)
        .create_async()
        .await
}

async fn mock_database_query(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/dbs")
        .match_header("authorization", Matcher::Regex(SIGNED.to_string()))
        .match_header("x-ms-documentdb-isquery", Matcher::Regex("(?i)^true$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-ms-request-charge", "1")
        .with_body(r#"{"_rid":"","Databases":[],"_count":0}"#)
        .create_async()
        .await
}

async fn connect(server: &mut ServerGuard) -> Connection {
    let _account = mock_account_properties(server).await;
    let databases = mock_database_query(server).await;
    let connection = DocumentStoreClient::connect(settings(server)).await.unwrap();
    databases.assert_async().await;
    connection
}

fn collection() -> CollectionRef {
    CollectionRef::from_names("db", "coll").unwrap()
}

fn store_error(err: SamplesError) -> StoreError {
    match err {
        SamplesError::Store(e) => e,
        other => panic!("expected a store error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_signs_requests() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;
    assert_eq!(connection.backend_name(), "cosmosdb");
    connection.close().unwrap();
}

#[tokio::test]
async fn test_rejected_credentials_fail_to_connect() {
    let mut server = Server::new_async().await;
    let unauthorized = r#"{"code":"Unauthorized","message":"The input authorization token can't serve the request."}"#;
    let _account = server
        .mock("GET", "/")
        .with_status(401)
        .with_body(unauthorized)
        .create_async()
        .await;
    let _databases = server
        .mock("POST", "/dbs")
        .with_status(401)
        .with_body(unauthorized)
        .create_async()
        .await;

    let err = DocumentStoreClient::connect(settings(&server))
        .await
        .unwrap_err();
    assert!(matches!(store_error(err), StoreError::ConnectionFailed(_)));
}

#[tokio::test]
async fn test_cross_partition_query_follows_continuation_tokens() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let first = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .match_header("x-ms-documentdb-isquery", "True")
        .match_header("content-type", "application/query+json")
        .match_header("x-ms-max-item-count", "2")
        .match_header("x-ms-documentdb-query-enablecrosspartition", "True")
        .match_header("x-ms-continuation", Matcher::Missing)
        .match_body(Matcher::PartialJson(json!({"query": "SELECT * FROM c"})))
        .with_status(200)
        .with_header("x-ms-request-charge", "2.5")
        .with_header("x-ms-activity-id", "activity-1")
        .with_header("x-ms-continuation", "token-1")
        .with_body(r#"{"Documents":[{"id":"a"},{"id":"b"}],"_count":2}"#)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .match_header("x-ms-continuation", "token-1")
        .with_status(200)
        .with_header("x-ms-request-charge", "1.5")
        .with_body(r#"{"Documents":[{"id":"c"}],"_count":1}"#)
        .create_async()
        .await;

    let options = FeedOptions::default().with_max_item_count(2);
    let mut pager = connection
        .query(&collection(), SqlQuerySpec::new("SELECT * FROM c"), Some(&options))
        .unwrap();

    let page = pager.next().await.unwrap().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.continuation.as_deref(), Some("token-1"));
    assert_eq!(page.activity_id.as_deref(), Some("activity-1"));

    let page = pager.next().await.unwrap().unwrap();
    assert_eq!(page.documents[0].id(), Some("c"));
    assert!(!page.has_more());
    assert!((page.cumulative_request_charge - 4.0).abs() < 1e-9);

    assert!(pager.next().await.is_none());
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_single_partition_query_pages_through_the_sdk() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let first = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .match_header("authorization", Matcher::Regex(SIGNED.to_string()))
        .match_header("x-ms-documentdb-partitionkey", r#"["Device001"]"#)
        .match_header("x-ms-continuation", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-ms-request-charge", "2.5")
        .with_header("x-ms-activity-id", "activity-1")
        .with_header("x-ms-continuation", "token-1")
        .with_body(r#"{"_rid":"","Documents":[{"id":"m1","IsMetadata":true}],"_count":1}"#)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .match_header("x-ms-continuation", "token-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-ms-request-charge", "1.5")
        .with_body(r#"{"_rid":"","Documents":[{"id":"m2","IsMetadata":true}],"_count":1}"#)
        .create_async()
        .await;

    let options = FeedOptions::default().with_partition_key("Device001");
    let pages = connection
        .query(
            &collection(),
            SqlQuerySpec::new("SELECT * FROM root r WHERE r.IsMetadata = true"),
            Some(&options),
        )
        .unwrap()
        .collect_pages()
        .await
        .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].documents[0].id(), Some("m1"));
    assert_eq!(pages[0].activity_id.as_deref(), Some("activity-1"));
    assert_eq!(pages[1].page_index, 1);
    assert!((pages[1].cumulative_request_charge - 4.0).abs() < 1e-9);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_plain_create_goes_through_the_sdk() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let _read_collection = server
        .mock("GET", "/dbs/db/colls/coll")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DEVICE_COLLECTION)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .match_header("authorization", Matcher::Regex(SIGNED.to_string()))
        .match_header("x-ms-documentdb-partitionkey", r#"["Device001"]"#)
        .match_header("x-ms-documentdb-post-trigger-include", Matcher::Missing)
        .match_header("x-ms-indexing-directive", Matcher::Missing)
        .match_body(Matcher::PartialJson(json!({"id": "meta", "DeviceId": "Device001"})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_header("x-ms-request-charge", "6.1")
        .with_header("x-ms-activity-id", "activity-3")
        .with_body(r#"{"id":"meta","DeviceId":"Device001","_rid":"abc"}"#)
        .create_async()
        .await;

    let document = Document::from_value(json!({"id": "meta", "DeviceId": "Device001"})).unwrap();
    let response = connection
        .create_document(&collection(), document, None)
        .await
        .unwrap();
    assert_eq!(response.resource.id(), Some("meta"));
    assert_eq!(response.activity_id.as_deref(), Some("activity-3"));
    assert!((response.request_charge - 6.1).abs() < 1e-9);
    create.assert_async().await;
}

#[tokio::test]
async fn test_sdk_conflict_is_write_conflict() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let _read_collection = server
        .mock("GET", "/dbs/db/colls/coll")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DEVICE_COLLECTION)
        .create_async()
        .await;
    let _create = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_header("x-ms-error-code", "Conflict")
        .with_body(r#"{"code":"Conflict","message":"Entity with the specified id already exists in the system."}"#)
        .create_async()
        .await;

    let document = Document::from_value(json!({"id": "meta", "DeviceId": "Device001"})).unwrap();
    let err = connection
        .create_document(&collection(), document, None)
        .await
        .unwrap_err();
    assert!(err.is_write_conflict());
}

#[tokio::test]
async fn test_bad_request_on_query_is_query_error() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let _query = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .with_status(400)
        .with_body(r#"{"code":"BadRequest","message":"Syntax error, incorrect syntax near 'FORM'."}"#)
        .create_async()
        .await;

    let mut pager = connection
        .query(&collection(), SqlQuerySpec::new("SELECT * FORM c"), None)
        .unwrap();
    let err = pager.next().await.unwrap().unwrap_err();
    assert!(matches!(store_error(err), StoreError::QueryFailed(m) if m.contains("FORM")));
}

#[tokio::test]
async fn test_create_document_sends_partition_key_and_triggers() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let read_collection = server
        .mock("GET", "/dbs/db/colls/coll")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DEVICE_COLLECTION)
        .expect(1)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .match_header("x-ms-documentdb-partitionkey", r#"["Device001"]"#)
        .match_header("x-ms-documentdb-post-trigger-include", "UpdateMetadata")
        .match_body(Matcher::PartialJson(json!({"DeviceId": "Device001", "Size": 7})))
        .with_status(201)
        .with_header("x-ms-request-charge", "5.71")
        .with_header("x-ms-activity-id", "activity-2")
        .with_body(r#"{"id":"d1","DeviceId":"Device001","Size":7,"_rid":"abc"}"#)
        .expect(2)
        .create_async()
        .await;

    let options = RequestOptions::default().with_post_trigger("UpdateMetadata");
    for id in ["d1", "d2"] {
        let document =
            Document::from_value(json!({"id": id, "DeviceId": "Device001", "Size": 7})).unwrap();
        let response = connection
            .create_document(&collection(), document, Some(&options))
            .await
            .unwrap();
        assert_eq!(response.activity_id.as_deref(), Some("activity-2"));
        assert!((response.request_charge - 5.71).abs() < 1e-9);
    }

    // The partition key definition is read once and cached
    read_collection.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn test_numeric_key_conflict_is_write_conflict() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let _read_collection = server
        .mock("GET", "/dbs/db/colls/coll")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"coll","_rid":"cGFydA==","partitionKey":{"paths":["/n"],"kind":"Hash"}}"#)
        .create_async()
        .await;
    let _create = server
        .mock("POST", "/dbs/db/colls/coll/docs")
        .match_header("x-ms-version", "2018-12-31")
        .match_header("x-ms-documentdb-partitionkey", "[7]")
        .with_status(409)
        .with_body(r#"{"code":"Conflict","message":"Entity with the specified id already exists in the system."}"#)
        .create_async()
        .await;

    let document = Document::from_value(json!({"id": "doc1", "n": 7})).unwrap();
    let err = connection
        .create_document(&collection(), document, None)
        .await
        .unwrap_err();
    assert!(err.is_write_conflict());
}

#[tokio::test]
async fn test_failing_stored_procedure_is_script_error() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let _execute = server
        .mock("POST", "/dbs/db/colls/coll/sprocs/SimpleScript")
        .match_header("authorization", Matcher::Regex(SIGNED.to_string()))
        .match_header("x-ms-version", "2018-12-31")
        .match_header("x-ms-consistency-level", "Session")
        .match_header("x-ms-date", Matcher::Regex(r"GMT$".to_string()))
        .match_header("x-ms-documentdb-partitionkey", "[{}]")
        .match_body(Matcher::Json(json!(["Hello"])))
        .with_status(400)
        .with_body(r#"{"code":"BadRequest","message":"Encountered exception while executing function."}"#)
        .create_async()
        .await;

    let options = RequestOptions::default().with_partition_key(PartitionKey::Undefined);
    let err = connection
        .execute_stored_procedure(&collection(), "SimpleScript", &[json!("Hello")], Some(&options))
        .await
        .unwrap_err();
    assert!(matches!(store_error(err), StoreError::ScriptFailed(_)));
}

#[tokio::test]
async fn test_stored_procedure_response_body() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let _execute = server
        .mock("POST", "/dbs/db/colls/coll/sprocs/SimpleScript")
        .with_status(200)
        .with_header("x-ms-request-charge", "3.1")
        .with_body(r#""Hello, {\"id\":\"x\"}""#)
        .create_async()
        .await;

    let response = connection
        .execute_stored_procedure(&collection(), "SimpleScript", &[json!("Hello")], None)
        .await
        .unwrap();
    assert_eq!(response.response_as_string(), r#"Hello, {"id":"x"}"#);
}

#[tokio::test]
async fn test_throttling_is_reported() {
    let mut server = Server::new_async().await;
    let connection = connect(&mut server).await;

    let _execute = server
        .mock("POST", "/dbs/db/colls/coll/sprocs/SimpleScript")
        .with_status(429)
        .with_header("x-ms-retry-after-ms", "250")
        .with_body(r#"{"code":"TooManyRequests","message":"Request rate is large"}"#)
        .create_async()
        .await;

    let err = connection
        .execute_stored_procedure(&collection(), "SimpleScript", &[json!("Hello")], None)
        .await
        .unwrap_err();
    assert!(matches!(store_error(err), StoreError::Throttled(after) if after == "250"));
}
