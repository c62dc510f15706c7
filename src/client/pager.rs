//! Lazy query paging
//!
//! A [`QueryPager`] fetches one page per poll and stops after the page that
//! carries no continuation token, or right after yielding an error.

use crate::adapters::store::{DocumentStore, FeedPage};
use crate::domain::{CollectionRef, Document, FeedOptions, Result, ResultPage, SqlQuerySpec};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

struct QueryContext {
    store: Arc<dyn DocumentStore>,
    collection: CollectionRef,
    query: SqlQuerySpec,
    options: FeedOptions,
}

/// Position of the next page to fetch
struct Cursor {
    continuation: Option<String>,
    page_index: usize,
    cumulative_request_charge: f64,
}

/// Turns a backend page into the page at `cursor`
fn result_page(cursor: &Cursor, feed: FeedPage<Document>) -> ResultPage {
    crate::log_request_charge!(
        "query_documents",
        feed.request_charge,
        feed.activity_id.as_deref()
    );
    ResultPage {
        page_index: cursor.page_index,
        documents: feed.items,
        request_charge: feed.request_charge,
        cumulative_request_charge: cursor.cumulative_request_charge + feed.request_charge,
        continuation: feed.continuation,
        activity_id: feed.activity_id,
    }
}

async fn fetch_page(
    context: Arc<QueryContext>,
    cursor: Option<Cursor>,
) -> Option<(Result<ResultPage>, Option<Cursor>)> {
    let cursor = cursor?;
    let fetched = context
        .store
        .query_documents(
            &context.collection,
            &context.query,
            &context.options,
            cursor.continuation.as_deref(),
        )
        .await;

    match fetched {
        Ok(feed) => {
            let page = result_page(&cursor, feed);
            let next = page.continuation.clone().map(|token| Cursor {
                continuation: Some(token),
                page_index: cursor.page_index + 1,
                cumulative_request_charge: page.cumulative_request_charge,
            });
            Some((Ok(page), next))
        }
        Err(e) => {
            tracing::warn!(
                collection = %context.collection,
                page_index = cursor.page_index,
                error = %e,
                "Query page failed"
            );
            Some((Err(e), None))
        }
    }
}

/// Lazy sequence of result pages
///
/// Implements `Stream<Item = Result<ResultPage>>`. Nothing is sent to the
/// store until the first poll. The pager holds its own handle to the
/// backend, so it keeps working if the connection is closed meanwhile.
///
/// # Example
///
/// ```
/// use cosmos_samples::client::{ConnectionSettings, DocumentStoreClient};
/// use cosmos_samples::config::secret_string;
/// use cosmos_samples::domain::{CollectionDefinition, CollectionRef, DatabaseId, SqlQuerySpec};
/// use futures::StreamExt;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let settings = ConnectionSettings::new("memory://local", secret_string(String::new()));
/// let connection = DocumentStoreClient::connect(settings).await.unwrap();
/// let db = DatabaseId::new("db").unwrap();
/// connection.create_database(&db).await.unwrap();
/// let definition = CollectionDefinition::named("coll").unwrap();
/// connection.create_collection(&db, &definition).await.unwrap();
///
/// let coll = CollectionRef::new(db, definition.id);
/// let mut pager = connection.query(&coll, SqlQuerySpec::new("SELECT * FROM c"), None).unwrap();
/// while let Some(page) = pager.next().await {
///     let page = page.unwrap();
///     println!("{} document(s), {} RU", page.len(), page.request_charge);
/// }
/// # });
/// ```
pub struct QueryPager {
    inner: BoxStream<'static, Result<ResultPage>>,
    cumulative_request_charge: f64,
    pages_fetched: usize,
}

impl QueryPager {
    pub(crate) fn new(
        store: Arc<dyn DocumentStore>,
        collection: CollectionRef,
        query: SqlQuerySpec,
        options: FeedOptions,
    ) -> Self {
        let context = Arc::new(QueryContext {
            store,
            collection,
            query,
            options,
        });
        let first = Cursor {
            continuation: None,
            page_index: 0,
            cumulative_request_charge: 0.0,
        };
        let inner = stream::unfold(Some(first), move |cursor| {
            fetch_page(Arc::clone(&context), cursor)
        })
        .boxed();

        Self {
            inner,
            cumulative_request_charge: 0.0,
            pages_fetched: 0,
        }
    }

    /// Wraps a page stream the backend follows by itself
    pub(crate) fn from_stream(
        collection: CollectionRef,
        pages: BoxStream<'static, Result<FeedPage<Document>>>,
    ) -> Self {
        let first = Cursor {
            continuation: None,
            page_index: 0,
            cumulative_request_charge: 0.0,
        };
        let inner = stream::unfold(Some((pages, first)), move |state| {
            let collection = collection.clone();
            async move {
                let (mut pages, cursor) = state?;
                match pages.next().await? {
                    Ok(feed) => {
                        let page = result_page(&cursor, feed);
                        let next = Cursor {
                            continuation: page.continuation.clone(),
                            page_index: cursor.page_index + 1,
                            cumulative_request_charge: page.cumulative_request_charge,
                        };
                        Some((Ok(page), Some((pages, next))))
                    }
                    Err(e) => {
                        tracing::warn!(
                            collection = %collection,
                            page_index = cursor.page_index,
                            error = %e,
                            "Query page failed"
                        );
                        Some((Err(e), None))
                    }
                }
            }
        })
        .boxed();

        Self {
            inner,
            cumulative_request_charge: 0.0,
            pages_fetched: 0,
        }
    }

    /// Request units charged by the pages fetched so far
    pub fn cumulative_request_charge(&self) -> f64 {
        self.cumulative_request_charge
    }

    /// Number of pages yielded so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Drains the pager, stopping at the first error
    pub async fn collect_pages(self) -> Result<Vec<ResultPage>> {
        self.try_collect().await
    }

    /// Drains the pager and concatenates the documents of every page
    pub async fn collect_documents(self) -> Result<Vec<Document>> {
        let pages = self.collect_pages().await?;
        Ok(pages.into_iter().flat_map(|page| page.documents).collect())
    }
}

impl Stream for QueryPager {
    type Item = Result<ResultPage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.poll_next_unpin(cx);
        if let Poll::Ready(Some(Ok(page))) = &polled {
            self.cumulative_request_charge = page.cumulative_request_charge;
            self.pages_fetched += 1;
        }
        polled
    }
}

impl std::fmt::Debug for QueryPager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPager")
            .field("cumulative_request_charge", &self.cumulative_request_charge)
            .field("pages_fetched", &self.pages_fetched)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::{CollectionDefinition, DatabaseId, RequestOptions};
    use serde_json::json;

    async fn populated_store(count: usize) -> (Arc<dyn DocumentStore>, CollectionRef) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let db = DatabaseId::new("db").unwrap();
        store.create_database(&db).await.unwrap();
        let definition = CollectionDefinition::named("coll").unwrap();
        store.create_collection(&db, &definition).await.unwrap();
        let coll = CollectionRef::new(db, definition.id);
        for i in 0..count {
            let doc = Document::from_value(json!({"id": format!("doc{i}"), "n": i})).unwrap();
            store
                .create_document(&coll, doc, &RequestOptions::default())
                .await
                .unwrap();
        }
        (store, coll)
    }

    #[tokio::test]
    async fn test_pages_are_indexed_and_charges_accumulate() {
        let (store, coll) = populated_store(5).await;
        let mut pager = QueryPager::new(
            store,
            coll,
            SqlQuerySpec::new("SELECT * FROM c"),
            FeedOptions::default().with_max_item_count(2),
        );

        let mut last_cumulative = 0.0;
        let mut indexes = Vec::new();
        while let Some(page) = pager.next().await {
            let page = page.unwrap();
            assert!(page.cumulative_request_charge > last_cumulative);
            last_cumulative = page.cumulative_request_charge;
            indexes.push(page.page_index);
        }
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(pager.pages_fetched(), 3);
        assert!((pager.cumulative_request_charge() - last_cumulative).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_error_ends_the_pager() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let coll = CollectionRef::from_names("missing", "coll").unwrap();
        let mut pager = QueryPager::new(
            store,
            coll,
            SqlQuerySpec::new("SELECT * FROM c"),
            FeedOptions::default(),
        );
        assert!(pager.next().await.unwrap().is_err());
        assert!(pager.next().await.is_none());
    }

    #[tokio::test]
    async fn test_collect_documents() {
        let (store, coll) = populated_store(4).await;
        let pager = QueryPager::new(
            store,
            coll,
            SqlQuerySpec::new("SELECT * FROM c WHERE c.n < 3"),
            FeedOptions::default().with_max_item_count(1),
        );
        let docs = pager.collect_documents().await.unwrap();
        let ids: Vec<_> = docs.iter().filter_map(|d| d.id()).collect();
        assert_eq!(ids, vec!["doc0", "doc1", "doc2"]);
    }

    fn feed(ids: &[&str], charge: f64, continuation: Option<&str>) -> Result<FeedPage<Document>> {
        Ok(FeedPage {
            items: ids
                .iter()
                .map(|id| Document::from_value(json!({"id": id})).unwrap())
                .collect(),
            request_charge: charge,
            continuation: continuation.map(str::to_string),
            activity_id: None,
        })
    }

    #[tokio::test]
    async fn test_streamed_pages_are_indexed() {
        let pages = stream::iter(vec![
            feed(&["a", "b"], 2.5, Some("token-1")),
            feed(&["c"], 1.5, None),
        ])
        .boxed();
        let coll = CollectionRef::from_names("db", "coll").unwrap();
        let pages = QueryPager::from_stream(coll, pages).collect_pages().await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].page_index, 1);
        assert_eq!(pages[0].continuation.as_deref(), Some("token-1"));
        assert!((pages[1].cumulative_request_charge - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_streamed_error_ends_the_pager() {
        let pages = stream::iter(vec![
            Err(crate::domain::SamplesError::Store(
                crate::domain::StoreError::QueryFailed("bad".to_string()),
            )),
            feed(&["never"], 1.0, None),
        ])
        .boxed();
        let coll = CollectionRef::from_names("db", "coll").unwrap();
        let mut pager = QueryPager::from_stream(coll, pages);
        assert!(pager.next().await.unwrap().is_err());
        assert!(pager.next().await.is_none());
    }
}
