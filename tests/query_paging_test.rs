//! Integration tests for paged queries on the in-memory backend

use cosmos_samples::client::{Connection, ConnectionSettings, DocumentStoreClient};
use cosmos_samples::config::secret_string;
use cosmos_samples::domain::{
    CollectionDefinition, CollectionRef, DatabaseId, Document, FeedOptions, PartitionKeyDefinition,
    SqlQuerySpec,
};
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use test_case::test_case;

async fn seeded(count: usize, partitioned: bool) -> (Connection, CollectionRef) {
    let settings = ConnectionSettings::new("memory://local", secret_string(String::new()));
    let connection = DocumentStoreClient::connect(settings).await.unwrap();

    let database = DatabaseId::new("PagingDB").unwrap();
    connection.create_database(&database).await.unwrap();
    let mut definition = CollectionDefinition::named("numbers").unwrap();
    if partitioned {
        definition = definition.with_partition_key(PartitionKeyDefinition::hash("/group"));
    }
    connection
        .create_collection(&database, &definition)
        .await
        .unwrap();
    let collection = CollectionRef::new(database, definition.id);

    for n in 0..count {
        let document = Document::from_value(json!({
            "id": format!("doc{n:03}"),
            "n": n,
            "group": if n % 2 == 0 { "even" } else { "odd" }
        }))
        .unwrap();
        connection
            .create_document(&collection, document, None)
            .await
            .unwrap();
    }

    (connection, collection)
}

async fn all_documents(
    connection: &Connection,
    collection: &CollectionRef,
    query: &SqlQuerySpec,
    options: &FeedOptions,
) -> Vec<Document> {
    connection
        .query(collection, query.clone(), Some(options))
        .unwrap()
        .map_ok(|page| page.documents)
        .try_concat()
        .await
        .unwrap()
}

#[test_case(25, 10, &[10, 10, 5]; "partial last page")]
#[test_case(20, 10, &[10, 10]; "exact multiple")]
#[test_case(3, 100, &[3]; "single page")]
#[test_case(0, 10, &[0]; "no matches")]
#[tokio::test]
async fn test_page_sizes(count: usize, page_size: u32, expected: &[usize]) {
    let (connection, collection) = seeded(count, false).await;
    let options = FeedOptions::default().with_max_item_count(page_size);
    let pages = connection
        .query(&collection, SqlQuerySpec::new("SELECT * FROM c"), Some(&options))
        .unwrap()
        .collect_pages()
        .await
        .unwrap();

    assert!(pages.last().unwrap().continuation.is_none());
    assert!(pages[..pages.len() - 1].iter().all(|p| p.continuation.is_some()));
    let sizes: Vec<usize> = pages.iter().map(|p| p.len()).collect();
    assert_eq!(sizes, expected);
}

#[tokio::test]
async fn test_pages_are_stable_and_cumulative() {
    let (connection, collection) = seeded(12, false).await;
    let options = FeedOptions::default().with_max_item_count(5);
    let query = SqlQuerySpec::new("SELECT * FROM c WHERE c.n >= 2");

    let first = all_documents(&connection, &collection, &query, &options).await;
    let second = all_documents(&connection, &collection, &query, &options).await;

    assert_eq!(first.len(), 10);
    assert_eq!(first, second);
    assert_eq!(first[0].id(), Some("doc002"));

    let mut pager = connection
        .query(&collection, query.clone(), Some(&options))
        .unwrap();
    let mut sum = 0.0;
    let mut index = 0;
    while let Some(page) = pager.next().await {
        let page = page.unwrap();
        assert_eq!(page.page_index, index);
        sum += page.request_charge;
        assert!((page.cumulative_request_charge - sum).abs() < 1e-9);
        index += 1;
    }
    assert_eq!(pager.pages_fetched(), 2);
    assert!((pager.cumulative_request_charge() - sum).abs() < 1e-9);
}

#[tokio::test]
async fn test_parameterised_query() {
    let (connection, collection) = seeded(6, false).await;
    let query = SqlQuerySpec::new("SELECT * FROM c WHERE c.group = @group")
        .with_parameter("@group", "odd")
        .unwrap();
    let documents = connection
        .query(&collection, query, None)
        .unwrap()
        .collect_documents()
        .await
        .unwrap();
    assert_eq!(documents.len(), 3);
}

#[tokio::test]
async fn test_cross_partition_query_needs_opt_in() {
    let (connection, collection) = seeded(6, true).await;
    let query = SqlQuerySpec::new("SELECT * FROM c");

    let disabled = FeedOptions::default().with_cross_partition(false);
    let err = connection
        .query(&collection, query.clone(), Some(&disabled))
        .unwrap()
        .collect_documents()
        .await
        .unwrap_err();
    assert!(err.is_query_error());

    let routed = disabled.clone().with_partition_key("even");
    let documents = connection
        .query(&collection, query.clone(), Some(&routed))
        .unwrap()
        .collect_documents()
        .await
        .unwrap();
    assert_eq!(documents.len(), 3);

    let fan_out = FeedOptions::default().with_cross_partition(true);
    let documents = connection
        .query(&collection, query, Some(&fan_out))
        .unwrap()
        .collect_documents()
        .await
        .unwrap();
    assert_eq!(documents.len(), 6);
}

#[tokio::test]
async fn test_empty_query_text_is_rejected() {
    let (connection, collection) = seeded(1, false).await;
    let err = connection
        .query(&collection, SqlQuerySpec::new("   "), None)
        .unwrap_err();
    assert!(err.is_query_error());
}

#[test_case(100; "moderate")]
#[test_case(1000; "deep")]
#[test_case(6000; "very deep")]
#[tokio::test]
async fn test_deeply_nested_filter_fails_as_query_error(depth: usize) {
    let (connection, collection) = seeded(1, false).await;
    let text = format!(
        "SELECT * FROM c WHERE {}c.n = 0{}",
        "(".repeat(depth),
        ")".repeat(depth)
    );

    let result = connection
        .query(&collection, SqlQuerySpec::new(text), None)
        .unwrap()
        .collect_pages()
        .await;

    if depth <= 128 {
        assert_eq!(result.unwrap()[0].len(), 1);
    } else {
        assert!(result.unwrap_err().is_query_error());
    }
}
