//! Index management sample
//!
//! Shows how indexing directives and collection indexing policies change
//! which documents a query can see:
//!
//! 1. Exclude a document from the index on write
//! 2. Manual indexing: only documents written with `Include` are indexed
//! 3. Lazy indexing
//! 4. Exclude a path from the index

use super::{output_results, SampleSummary};
use crate::client::Connection;
use crate::domain::{
    CollectionDefinition, CollectionRef, DatabaseId, Document, IndexingDirective, IndexingMode,
    IndexingPolicy, RequestOptions, Result, SamplesError,
};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// The four indexing demos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDemo {
    ExplicitlyExcludeFromIndex,
    UseManualIndexing,
    UseLazyIndexing,
    ExcludePathsFromIndex,
}

impl IndexDemo {
    pub const ALL: [IndexDemo; 4] = [
        IndexDemo::ExplicitlyExcludeFromIndex,
        IndexDemo::UseManualIndexing,
        IndexDemo::UseLazyIndexing,
        IndexDemo::ExcludePathsFromIndex,
    ];

    /// Step name; also the id of the collection the demo creates
    pub fn name(&self) -> &'static str {
        match self {
            IndexDemo::ExplicitlyExcludeFromIndex => "ExplicitlyExcludeFromIndex",
            IndexDemo::UseManualIndexing => "UseManualIndexing",
            IndexDemo::UseLazyIndexing => "UseLazyIndexing",
            IndexDemo::ExcludePathsFromIndex => "ExcludePathsFromIndex",
        }
    }
}

impl fmt::Display for IndexDemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexDemo {
    type Err = String;

    /// Accepts the step name in any case, with or without dashes
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.replace(['-', '_'], "").to_ascii_lowercase();
        IndexDemo::ALL
            .into_iter()
            .find(|demo| demo.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown index demo '{s}'. Expected one of: {}",
                    IndexDemo::ALL.map(|d| d.name()).join(", ")
                )
            })
    }
}

/// Index management sample suite
pub struct IndexingSamples<'a> {
    connection: &'a Connection,
    database: DatabaseId,
}

impl<'a> IndexingSamples<'a> {
    pub fn new(connection: &'a Connection, database: DatabaseId) -> Self {
        Self {
            connection,
            database,
        }
    }

    /// Drops the sample database if it exists and creates it again
    pub async fn setup(&self) -> Result<()> {
        if self.connection.cleanup_database(&self.database).await? {
            tracing::info!(database = %self.database, "Removed database from a previous run");
        }
        self.connection.create_database(&self.database).await?;
        Ok(())
    }

    /// Recreates the database, then runs the given demos in order
    pub async fn run(&self, demos: &[IndexDemo]) -> SampleSummary {
        let started = Instant::now();
        let mut summary = SampleSummary::new("index-management");

        summary.begin_step("Setup");
        if let Err(e) = self.setup().await {
            summary.fail("Setup", "creating the database", &e);
            return summary.with_duration(started.elapsed());
        }

        for demo in demos {
            summary.begin_step(demo.name());
            if let Err(e) = self.run_demo(*demo, &mut summary).await {
                summary.fail(demo.name(), "running the demo", &e);
            }
        }

        summary.with_duration(started.elapsed())
    }

    async fn run_demo(&self, demo: IndexDemo, summary: &mut SampleSummary) -> Result<()> {
        match demo {
            IndexDemo::ExplicitlyExcludeFromIndex => self.explicitly_exclude_from_index(summary).await,
            IndexDemo::UseManualIndexing => self.use_manual_indexing(summary).await,
            IndexDemo::UseLazyIndexing => self.use_lazy_indexing(summary).await,
            IndexDemo::ExcludePathsFromIndex => self.exclude_paths_from_index(summary).await,
        }
    }

    /// doc2 is written with `Exclude`, so only doc1 is found
    pub async fn explicitly_exclude_from_index(&self, summary: &mut SampleSummary) -> Result<()> {
        let step = IndexDemo::ExplicitlyExcludeFromIndex.name();
        let collection = self.create_collection(step, None, summary).await?;

        self.create_document(
            &collection,
            json!({"id": "doc1", "order": "001", "contact": "email"}),
            None,
            summary,
        )
        .await?;
        self.create_document(
            &collection,
            json!({"id": "doc2", "order": "002", "contact": "email"}),
            Some(&RequestOptions::default().with_indexing_directive(IndexingDirective::Exclude)),
            summary,
        )
        .await?;

        output_results(
            self.connection,
            &collection,
            step,
            "SELECT * FROM root r WHERE r.contact='email'",
            None,
            summary,
        )
        .await?;
        Ok(())
    }

    /// Automatic indexing off: doc3 is not indexed, doc4 opts in with `Include`
    pub async fn use_manual_indexing(&self, summary: &mut SampleSummary) -> Result<()> {
        let step = IndexDemo::UseManualIndexing.name();
        let collection = self
            .create_collection(step, Some(IndexingPolicy::manual()), summary)
            .await?;

        self.create_document(
            &collection,
            json!({"id": "doc3", "order": "003", "contact": "phone"}),
            None,
            summary,
        )
        .await?;
        self.create_document(
            &collection,
            json!({"id": "doc4", "order": "004", "contact": "phone"}),
            Some(&RequestOptions::default().with_indexing_directive(IndexingDirective::Include)),
            summary,
        )
        .await?;

        output_results(
            self.connection,
            &collection,
            step,
            "SELECT * FROM root r WHERE r.contact='phone'",
            None,
            summary,
        )
        .await?;
        Ok(())
    }

    pub async fn use_lazy_indexing(&self, summary: &mut SampleSummary) -> Result<()> {
        let step = IndexDemo::UseLazyIndexing.name();
        let collection = self
            .create_collection(step, Some(IndexingPolicy::with_mode(IndexingMode::Lazy)), summary)
            .await?;

        self.create_document(
            &collection,
            json!({"id": "doc5", "order": "005", "contact": "text"}),
            None,
            summary,
        )
        .await?;

        output_results(
            self.connection,
            &collection,
            step,
            "SELECT * FROM root r WHERE r.contact='text'",
            None,
            summary,
        )
        .await?;
        Ok(())
    }

    /// `/nonsearchable/?` is excluded: filtering on it is rejected without scan
    pub async fn exclude_paths_from_index(&self, summary: &mut SampleSummary) -> Result<()> {
        let step = IndexDemo::ExcludePathsFromIndex.name();
        let policy = IndexingPolicy::default()
            .include_path("/*")
            .exclude_path("/nonsearchable/?");
        let collection = self.create_collection(step, Some(policy), summary).await?;

        self.create_document(
            &collection,
            json!({
                "id": "doc6",
                "order": "006",
                "contact": "text",
                "searchable": "value1",
                "nonsearchable": "value2"
            }),
            None,
            summary,
        )
        .await?;

        output_results(
            self.connection,
            &collection,
            step,
            "SELECT * FROM root r WHERE r.contact='text'",
            None,
            summary,
        )
        .await?;

        match output_results(
            self.connection,
            &collection,
            step,
            "SELECT * FROM root r WHERE r.nonsearchable='value1'",
            None,
            summary,
        )
        .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_query_error() => {
                summary.say(format!(
                    "{step}: query on an excluded path was rejected as expected: {e}"
                ));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_collection(
        &self,
        id: &str,
        policy: Option<IndexingPolicy>,
        summary: &mut SampleSummary,
    ) -> Result<CollectionRef> {
        let mut definition = CollectionDefinition::named(id).map_err(SamplesError::Validation)?;
        if let Some(policy) = policy {
            definition = definition.with_indexing_policy(policy);
        }

        let response = self
            .connection
            .create_collection(&self.database, &definition)
            .await?;
        summary.charge(response.request_charge);
        summary.say(format!(
            "{} has been created with indexing policy {:?}",
            definition.id,
            definition.effective_indexing_policy().indexing_mode
        ));

        Ok(CollectionRef::new(self.database.clone(), definition.id))
    }

    async fn create_document(
        &self,
        collection: &CollectionRef,
        body: Value,
        options: Option<&RequestOptions>,
        summary: &mut SampleSummary,
    ) -> Result<()> {
        let document = Document::from_value(body)?;
        let response = self
            .connection
            .create_document(collection, document, options)
            .await?;
        summary.charge(response.request_charge);
        summary.say(format!(
            "{} has been created.",
            response
                .activity_id
                .as_deref()
                .or(response.resource.id())
                .unwrap_or_default()
        ));
        Ok(())
    }
}
