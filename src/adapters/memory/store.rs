//! In-process document store
//!
//! Keeps databases, collections, documents and scripts in memory. Documents
//! are stored in insertion order, so a query over an unchanged collection
//! always pages the same way; the continuation token is the offset of the
//! next result.

use super::query::SelectQuery;
use crate::adapters::store::{DocumentStore, FeedPage};
use crate::domain::{
    CollectionDefinition, CollectionRef, DatabaseId, DatabaseInfo, Document, FeedOptions,
    IndexingDirective, IndexingMode, PartitionKey, RequestOptions, ResourceResponse, Result,
    SqlQuerySpec, StoreError, StoredProcedure, StoredProcedureResponse, Trigger, TriggerType,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Page size used when a query does not set `max_item_count`
pub const DEFAULT_PAGE_SIZE: usize = 100;

const DATABASE_CHARGE: f64 = 4.95;
const COLLECTION_CHARGE: f64 = 4.76;
const WRITE_CHARGE: f64 = 5.71;
const READ_CHARGE: f64 = 1.0;
const QUERY_PAGE_CHARGE: f64 = 2.79;
const QUERY_DOCUMENT_CHARGE: f64 = 0.13;

struct StoredDocument {
    document: Document,
    partition_key: PartitionKey,
    indexed: bool,
}

struct StoredCollection {
    definition: CollectionDefinition,
    documents: Vec<StoredDocument>,
    procedures: Vec<StoredProcedure>,
    triggers: Vec<Trigger>,
}

impl StoredCollection {
    fn is_partitioned(&self) -> bool {
        self.definition.partition_key.is_some()
    }

    fn partition_matches(&self, stored: &PartitionKey, requested: &PartitionKey) -> bool {
        !self.is_partitioned() || stored == requested
    }
}

struct StoredDatabase {
    info: DatabaseInfo,
    collections: Vec<StoredCollection>,
}

#[derive(Default)]
struct State {
    databases: Vec<StoredDatabase>,
    next_rid: u64,
}

impl State {
    fn next_rid(&mut self) -> String {
        self.next_rid += 1;
        format!("{:016x}", self.next_rid)
    }

    fn database_mut(&mut self, id: &DatabaseId) -> Option<&mut StoredDatabase> {
        self.databases.iter_mut().find(|db| &db.info.id == id)
    }

    fn collection(&self, coll: &CollectionRef) -> Option<&StoredCollection> {
        self.databases
            .iter()
            .find(|db| &db.info.id == coll.database())?
            .collections
            .iter()
            .find(|c| &c.definition.id == coll.collection())
    }

    fn collection_mut(&mut self, coll: &CollectionRef) -> Option<&mut StoredCollection> {
        self.database_mut(coll.database())?
            .collections
            .iter_mut()
            .find(|c| &c.definition.id == coll.collection())
    }
}

fn collection_not_found(coll: &CollectionRef) -> StoreError {
    StoreError::NotFound(format!("Collection '{coll}' does not exist"))
}

fn activity_id() -> Option<String> {
    Some(Uuid::new_v4().to_string())
}

/// In-memory document store
///
/// Emulates the parts of the service the samples rely on: resource
/// lifecycle, conflict detection, partition routing, paging and the
/// visibility effects of indexing policies. Scripts are stored but never run.
///
/// # Examples
///
/// ```
/// use cosmos_samples::adapters::memory::MemoryStore;
/// use cosmos_samples::adapters::store::DocumentStore;
/// use cosmos_samples::domain::DatabaseId;
///
/// # tokio_test_block(async {
/// let store = MemoryStore::new();
/// let db = DatabaseId::new("IndexManagement").unwrap();
/// store.create_database(&db).await.unwrap();
/// assert!(store.create_database(&db).await.is_err());
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn check_triggers(
    collection: &StoredCollection,
    names: &[String],
    expected: TriggerType,
) -> std::result::Result<(), StoreError> {
    for name in names {
        let trigger = collection
            .triggers
            .iter()
            .find(|t| &t.id == name)
            .ok_or_else(|| StoreError::NotFound(format!("Trigger '{name}' does not exist")))?;
        if trigger.trigger_type != expected {
            return Err(StoreError::Validation(format!(
                "Trigger '{name}' is a {:?}-trigger and cannot be used as a {expected:?}-trigger",
                trigger.trigger_type
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn create_database(&self, id: &DatabaseId) -> Result<ResourceResponse<DatabaseInfo>> {
        let mut state = self.lock();
        if state.databases.iter().any(|db| &db.info.id == id) {
            return Err(StoreError::WriteConflict(format!("Database '{id}' already exists")).into());
        }

        let rid = state.next_rid();
        let info = DatabaseInfo {
            id: id.clone(),
            self_link: Some(format!("dbs/{rid}/")),
            rid: Some(rid),
        };
        state.databases.push(StoredDatabase {
            info: info.clone(),
            collections: Vec::new(),
        });

        tracing::debug!(database = %id, "Created in-memory database");
        Ok(ResourceResponse::new(info, DATABASE_CHARGE, activity_id()))
    }

    async fn delete_database(&self, id: &DatabaseId) -> Result<ResourceResponse<()>> {
        let mut state = self.lock();
        let before = state.databases.len();
        state.databases.retain(|db| &db.info.id != id);
        if state.databases.len() == before {
            return Err(StoreError::NotFound(format!("Database '{id}' does not exist")).into());
        }
        Ok(ResourceResponse::new((), DATABASE_CHARGE, activity_id()))
    }

    async fn query_databases(&self, query: &SqlQuerySpec) -> Result<FeedPage<DatabaseInfo>> {
        let parsed = SelectQuery::parse(query).map_err(StoreError::QueryFailed)?;
        let state = self.lock();

        let mut items = Vec::new();
        for db in &state.databases {
            let doc = Document::from_serializable(&db.info)?;
            if parsed.matches(&doc) {
                items.push(db.info.clone());
            }
        }

        Ok(FeedPage {
            request_charge: QUERY_PAGE_CHARGE,
            items,
            continuation: None,
            activity_id: activity_id(),
        })
    }

    async fn create_collection(
        &self,
        database: &DatabaseId,
        definition: &CollectionDefinition,
    ) -> Result<ResourceResponse<CollectionDefinition>> {
        if let Some(key) = &definition.partition_key {
            key.validate().map_err(StoreError::Validation)?;
        }

        let mut state = self.lock();
        let db = state
            .database_mut(database)
            .ok_or_else(|| StoreError::NotFound(format!("Database '{database}' does not exist")))?;

        if db.collections.iter().any(|c| c.definition.id == definition.id) {
            return Err(StoreError::WriteConflict(format!(
                "Collection '{}' already exists in database '{database}'",
                definition.id
            ))
            .into());
        }

        let stored = definition
            .clone()
            .with_indexing_policy(definition.effective_indexing_policy());
        db.collections.push(StoredCollection {
            definition: stored.clone(),
            documents: Vec::new(),
            procedures: Vec::new(),
            triggers: Vec::new(),
        });

        tracing::debug!(
            database = %database,
            collection = %definition.id,
            "Created in-memory collection"
        );
        Ok(ResourceResponse::new(stored, COLLECTION_CHARGE, activity_id()))
    }

    async fn read_collection(
        &self,
        collection: &CollectionRef,
    ) -> Result<ResourceResponse<CollectionDefinition>> {
        let state = self.lock();
        let coll = state
            .collection(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        Ok(ResourceResponse::new(
            coll.definition.clone(),
            READ_CHARGE,
            activity_id(),
        ))
    }

    async fn query_documents(
        &self,
        collection: &CollectionRef,
        query: &SqlQuerySpec,
        options: &FeedOptions,
        continuation: Option<&str>,
    ) -> Result<FeedPage<Document>> {
        let parsed = SelectQuery::parse(query).map_err(StoreError::QueryFailed)?;
        let offset = match continuation {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                StoreError::QueryFailed(format!("Invalid continuation token '{token}'"))
            })?,
        };

        let state = self.lock();
        let coll = state.collection(collection).ok_or_else(|| {
            StoreError::QueryFailed(format!("Collection '{collection}' does not exist"))
        })?;

        let policy = coll.definition.effective_indexing_policy();
        if !options.enable_scan_in_query {
            if policy.indexing_mode == IndexingMode::None {
                return Err(StoreError::QueryFailed(
                    "Queries against a collection with indexing mode 'none' require scan to be enabled"
                        .to_string(),
                )
                .into());
            }
            let excluded: Vec<String> = parsed
                .filter_paths()
                .into_iter()
                .filter(|path| policy.is_path_excluded(path))
                .collect();
            if !excluded.is_empty() {
                return Err(StoreError::QueryFailed(format!(
                    "An invalid query has been specified with filters against path(s) excluded from indexing: {}. \
                     Enable scan in query to run it anyway",
                    excluded.join(", ")
                ))
                .into());
            }
        }

        if coll.is_partitioned()
            && options.partition_key.is_none()
            && !options.enable_cross_partition_query
        {
            return Err(StoreError::QueryFailed(
                "Cross partition query is required but disabled. Enable cross-partition query or set a partition key"
                    .to_string(),
            )
            .into());
        }

        let scan_unindexed =
            policy.indexing_mode == IndexingMode::None && options.enable_scan_in_query;
        let mut results: Vec<Document> = coll
            .documents
            .iter()
            .filter(|stored| stored.indexed || scan_unindexed)
            .filter(|stored| match &options.partition_key {
                Some(key) => coll.partition_matches(&stored.partition_key, key),
                None => true,
            })
            .filter(|stored| parsed.matches(&stored.document))
            .map(|stored| parsed.project(&stored.document))
            .collect();

        if let Some(top) = parsed.top() {
            results.truncate(top);
        }

        let page_size = options
            .max_item_count
            .map(|n| n.max(1) as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let total = results.len();
        let start = offset.min(total);
        let end = start.saturating_add(page_size).min(total);
        let items: Vec<Document> = results.drain(start..end).collect();
        let continuation = (end < total).then(|| end.to_string());

        Ok(FeedPage {
            request_charge: QUERY_PAGE_CHARGE + QUERY_DOCUMENT_CHARGE * items.len() as f64,
            items,
            continuation,
            activity_id: activity_id(),
        })
    }

    async fn create_document(
        &self,
        collection: &CollectionRef,
        document: Document,
        options: &RequestOptions,
    ) -> Result<ResourceResponse<Document>> {
        document
            .validate_for_create()
            .map_err(StoreError::Validation)?;

        let mut state = self.lock();
        let rid = state.next_rid();
        let coll = state
            .collection_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;

        check_triggers(coll, &options.pre_triggers, TriggerType::Pre)?;
        check_triggers(coll, &options.post_triggers, TriggerType::Post)?;
        if let Some(name) = options.pre_triggers.iter().chain(&options.post_triggers).next() {
            return Err(StoreError::ScriptFailed(format!(
                "Trigger '{name}' cannot be executed: the in-memory store has no JavaScript runtime"
            ))
            .into());
        }

        let extracted = document.partition_key(coll.definition.partition_key.as_ref());
        let partition_key = match &options.partition_key {
            Some(explicit) if coll.is_partitioned() && *explicit != extracted => {
                return Err(StoreError::Validation(
                    "Partition key provided either doesn't correspond to definition in the collection or doesn't match partition key field values specified in the document"
                        .to_string(),
                )
                .into());
            }
            _ => extracted,
        };

        let id = document.id().unwrap_or_default().to_string();
        let duplicate = coll.documents.iter().any(|stored| {
            stored.document.id() == Some(id.as_str())
                && coll.partition_matches(&stored.partition_key, &partition_key)
        });
        if duplicate {
            return Err(StoreError::WriteConflict(format!(
                "Entity with the specified id '{id}' already exists in the system"
            ))
            .into());
        }

        let policy = coll.definition.effective_indexing_policy();
        let indexed = policy.indexing_mode != IndexingMode::None
            && match options.indexing_directive {
                IndexingDirective::Include => true,
                IndexingDirective::Exclude => false,
                IndexingDirective::Default => policy.automatic,
            };

        let mut stored = document;
        stored.insert("_rid", Value::String(rid.clone()));
        stored.insert(
            "_self",
            Value::String(format!("{}/docs/{rid}/", collection.link())),
        );
        stored.insert("_etag", Value::String(format!("\"{}\"", Uuid::new_v4())));
        stored.insert("_ts", Value::from(chrono::Utc::now().timestamp()));
        stored.insert("_attachments", Value::String("attachments/".to_string()));

        coll.documents.push(StoredDocument {
            document: stored.clone(),
            partition_key,
            indexed,
        });

        Ok(ResourceResponse::new(stored, WRITE_CHARGE, activity_id()))
    }

    async fn read_document(
        &self,
        collection: &CollectionRef,
        id: &str,
        partition_key: &PartitionKey,
    ) -> Result<ResourceResponse<Document>> {
        let state = self.lock();
        let coll = state
            .collection(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        let stored = coll
            .documents
            .iter()
            .find(|stored| {
                stored.document.id() == Some(id)
                    && coll.partition_matches(&stored.partition_key, partition_key)
            })
            .ok_or_else(|| {
                StoreError::NotFound(format!("Document '{id}' does not exist in '{collection}'"))
            })?;
        Ok(ResourceResponse::new(
            stored.document.clone(),
            READ_CHARGE,
            activity_id(),
        ))
    }

    async fn create_stored_procedure(
        &self,
        collection: &CollectionRef,
        procedure: &StoredProcedure,
    ) -> Result<ResourceResponse<StoredProcedure>> {
        let mut state = self.lock();
        let coll = state
            .collection_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        if coll.procedures.iter().any(|p| p.id == procedure.id) {
            return Err(StoreError::WriteConflict(format!(
                "Stored procedure '{}' already exists",
                procedure.id
            ))
            .into());
        }
        coll.procedures.push(procedure.clone());
        Ok(ResourceResponse::new(
            procedure.clone(),
            WRITE_CHARGE,
            activity_id(),
        ))
    }

    async fn delete_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>> {
        let mut state = self.lock();
        let coll = state
            .collection_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        let before = coll.procedures.len();
        coll.procedures.retain(|p| p.id != id);
        if coll.procedures.len() == before {
            return Err(StoreError::NotFound(format!("Stored procedure '{id}' does not exist")).into());
        }
        Ok(ResourceResponse::new((), WRITE_CHARGE, activity_id()))
    }

    async fn execute_stored_procedure(
        &self,
        collection: &CollectionRef,
        id: &str,
        _args: &[Value],
        _options: &RequestOptions,
    ) -> Result<StoredProcedureResponse> {
        let state = self.lock();
        let coll = state
            .collection(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        if !coll.procedures.iter().any(|p| p.id == id) {
            return Err(StoreError::NotFound(format!("Stored procedure '{id}' does not exist")).into());
        }
        Err(StoreError::ScriptFailed(format!(
            "Stored procedure '{id}' cannot be executed: the in-memory store has no JavaScript runtime"
        ))
        .into())
    }

    async fn create_trigger(
        &self,
        collection: &CollectionRef,
        trigger: &Trigger,
    ) -> Result<ResourceResponse<Trigger>> {
        let mut state = self.lock();
        let coll = state
            .collection_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        if coll.triggers.iter().any(|t| t.id == trigger.id) {
            return Err(
                StoreError::WriteConflict(format!("Trigger '{}' already exists", trigger.id)).into(),
            );
        }
        coll.triggers.push(trigger.clone());
        Ok(ResourceResponse::new(trigger.clone(), WRITE_CHARGE, activity_id()))
    }

    async fn delete_trigger(
        &self,
        collection: &CollectionRef,
        id: &str,
    ) -> Result<ResourceResponse<()>> {
        let mut state = self.lock();
        let coll = state
            .collection_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        let before = coll.triggers.len();
        coll.triggers.retain(|t| t.id != id);
        if coll.triggers.len() == before {
            return Err(StoreError::NotFound(format!("Trigger '{id}' does not exist")).into());
        }
        Ok(ResourceResponse::new((), WRITE_CHARGE, activity_id()))
    }
}
