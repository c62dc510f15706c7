//! Server-side scripts sample
//!
//! Registers a stored procedure and a post-trigger on a partitioned
//! collection and runs them.

use super::SampleSummary;
use crate::client::Connection;
use crate::config::SamplesSection;
use crate::domain::{
    CollectionDefinition, CollectionRef, Document, FeedOptions, MetadataAggregate,
    PartitionKey, PartitionKeyDefinition, RequestOptions, Result, SamplesError, SqlQuerySpec,
    StoredProcedure, Trigger, TriggerOperation, TriggerType,
};
use rand::Rng;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

pub const SIMPLE_SCRIPT_ID: &str = "SimpleScript";
pub const SIMPLE_SCRIPT_BODY: &str = include_str!("../../resources/js/SimpleScript.js");

pub const UPDATE_METADATA_ID: &str = "UpdateMetadata";
pub const UPDATE_METADATA_BODY: &str = include_str!("../../resources/js/UpdateMetadata.js");

/// Device whose documents the post-trigger aggregates
pub const SAMPLE_DEVICE_ID: &str = "Device001";

const SAMPLE_DOCUMENT_COUNT: usize = 4;
const SAMPLE_SIZE_RANGE: std::ops::Range<i64> = 1..1000;

/// The script demos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptDemo {
    SimpleScript,
    PostTrigger,
}

impl ScriptDemo {
    pub const ALL: [ScriptDemo; 2] = [ScriptDemo::SimpleScript, ScriptDemo::PostTrigger];

    pub fn name(&self) -> &'static str {
        match self {
            ScriptDemo::SimpleScript => "RunSimpleScript",
            ScriptDemo::PostTrigger => "RunPostTrigger",
        }
    }
}

impl fmt::Display for ScriptDemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScriptDemo {
    type Err = String;

    /// Accepts `RunSimpleScript`, `simple-script`, `post-trigger` and so on
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.replace(['-', '_'], "").to_ascii_lowercase();
        let wanted = wanted.strip_prefix("run").unwrap_or(&wanted);
        ScriptDemo::ALL
            .into_iter()
            .find(|demo| demo.name()[3..].eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "Unknown script demo '{s}'. Expected one of: {}",
                    ScriptDemo::ALL.map(|d| d.name()).join(", ")
                )
            })
    }
}

/// Server-side scripts sample suite
pub struct ScriptSamples<'a> {
    connection: &'a Connection,
    collection: CollectionRef,
    partition_key: PartitionKeyDefinition,
}

impl<'a> ScriptSamples<'a> {
    pub fn new(
        connection: &'a Connection,
        collection: CollectionRef,
        partition_key: PartitionKeyDefinition,
    ) -> Self {
        Self {
            connection,
            collection,
            partition_key,
        }
    }

    /// Targets the configured scripts database, collection and partition key
    pub fn from_config(connection: &'a Connection, samples: &SamplesSection) -> Result<Self> {
        let collection =
            CollectionRef::from_names(&samples.scripts_database, &samples.scripts_collection)
                .map_err(SamplesError::Configuration)?;
        Ok(Self::new(
            connection,
            collection,
            PartitionKeyDefinition::hash(samples.scripts_partition_key.clone()),
        ))
    }

    /// Recreates the database and its partitioned collection
    pub async fn setup(&self) -> Result<()> {
        let database = self.collection.database();
        self.connection.cleanup_database(database).await?;
        self.connection.create_database(database).await?;

        let definition = CollectionDefinition::new(self.collection.collection().clone())
            .with_partition_key(self.partition_key.clone());
        self.connection
            .create_collection(database, &definition)
            .await?;
        Ok(())
    }

    /// Recreates the collection, then runs the given demos in order
    pub async fn run(&self, demos: &[ScriptDemo]) -> SampleSummary {
        let started = Instant::now();
        let mut summary = SampleSummary::new("server-side-scripts");

        summary.begin_step("Setup");
        if let Err(e) = self.setup().await {
            summary.fail("Setup", "creating the collection", &e);
            return summary.with_duration(started.elapsed());
        }

        for demo in demos {
            summary.begin_step(demo.name());
            let outcome = match demo {
                ScriptDemo::SimpleScript => self.run_simple_script(&mut summary).await,
                ScriptDemo::PostTrigger => self.run_post_trigger(&mut summary).await,
            };
            if let Err(e) = outcome {
                summary.fail(demo.name(), "running the script", &e);
            }
        }

        summary.with_duration(started.elapsed())
    }

    /// Registers `SimpleScript`, creates one document and runs the script
    /// with the prefix `Hello`
    pub async fn run_simple_script(&self, summary: &mut SampleSummary) -> Result<()> {
        if self
            .connection
            .try_delete_stored_procedure(&self.collection, SIMPLE_SCRIPT_ID)
            .await?
        {
            summary.say("stored procedure deleted.");
        }

        let procedure = StoredProcedure::new(SIMPLE_SCRIPT_ID, SIMPLE_SCRIPT_BODY);
        let created = self
            .connection
            .create_stored_procedure(&self.collection, &procedure)
            .await?;
        summary.charge(created.request_charge);
        summary.say(format!(
            "Stored procedure created {}",
            created.activity_id.as_deref().unwrap_or_default()
        ));

        let document = Document::from_value(json!({
            "LastName": "Estel",
            "Headquarters": "Russia",
            "Locations": {"Country": "Russia", "City": "Novosibirsk"},
            "Income": "50000"
        }))?;
        let created = self
            .connection
            .create_document(
                &self.collection,
                document,
                Some(&RequestOptions::default().with_generated_id()),
            )
            .await?;
        summary.charge(created.request_charge);
        summary.say(format!(
            "Document created {}",
            created.activity_id.as_deref().unwrap_or_default()
        ));

        let response = self
            .connection
            .execute_stored_procedure(
                &self.collection,
                SIMPLE_SCRIPT_ID,
                &[json!("Hello")],
                Some(&RequestOptions::default().with_partition_key(PartitionKey::Undefined)),
            )
            .await?;
        summary.charge(response.request_charge);
        summary.say(response.response_as_string());
        Ok(())
    }

    /// Registers the `UpdateMetadata` post-trigger, writes a few sized
    /// documents through it and reads back the aggregate
    pub async fn run_post_trigger(&self, summary: &mut SampleSummary) -> Result<()> {
        if self
            .connection
            .try_delete_trigger(&self.collection, UPDATE_METADATA_ID)
            .await?
        {
            summary.say("trigger deleted.");
        }

        let trigger = Trigger::new(
            UPDATE_METADATA_ID,
            UPDATE_METADATA_BODY,
            TriggerType::Post,
            TriggerOperation::Create,
        );
        let created = self
            .connection
            .create_trigger(&self.collection, &trigger)
            .await?;
        summary.charge(created.request_charge);
        summary.say(format!(
            "Trigger created {}",
            created.activity_id.as_deref().unwrap_or_default()
        ));

        let metadata = Document::from_serializable(&MetadataAggregate::new(SAMPLE_DEVICE_ID))?;
        let created = self
            .connection
            .create_document(&self.collection, metadata, None)
            .await?;
        summary.charge(created.request_charge);

        let options = RequestOptions::default()
            .with_post_trigger(UPDATE_METADATA_ID)
            .with_generated_id();
        for _ in 0..SAMPLE_DOCUMENT_COUNT {
            let size = random_size();
            let document = Document::from_value(json!({
                "DeviceId": SAMPLE_DEVICE_ID,
                "Size": size
            }))?;
            let created = self
                .connection
                .create_document(&self.collection, document, Some(&options))
                .await?;
            summary.charge(created.request_charge);
            summary.say(format!("Document created with size {size}"));
        }

        let documents = self
            .connection
            .query(
                &self.collection,
                SqlQuerySpec::new("SELECT * FROM root r WHERE r.IsMetadata = true"),
                Some(&FeedOptions::default().with_partition_key(SAMPLE_DEVICE_ID)),
            )?
            .collect_documents()
            .await?;

        let aggregate = documents
            .first()
            .ok_or_else(|| {
                SamplesError::Other(format!(
                    "Metadata document for '{SAMPLE_DEVICE_ID}' not found"
                ))
            })?
            .to_typed::<MetadataAggregate>()?;
        summary.say(format!(
            "Document statistics: min size: {}, max size: {}, total size: {}",
            aggregate.min_size, aggregate.max_size, aggregate.total_size
        ));
        Ok(())
    }
}

fn random_size() -> i64 {
    rand::thread_rng().gen_range(SAMPLE_SIZE_RANGE)
}
