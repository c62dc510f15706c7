//! Request charge sample
//!
//! Runs a fixed set of queries against an existing collection and reports
//! the request charge of every result page.

use super::{output_results, SampleSummary};
use crate::client::Connection;
use crate::config::SamplesSection;
use crate::domain::{
    CollectionDefinition, CollectionRef, Document, Result, SamplesError, StoreError,
};
use std::time::Instant;

/// Customer documents used by [`QuerySamples::seed`]
const CUSTOMERS_JSON: &str = include_str!("../../resources/data/customers.json");

/// A query with the step name it is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: &'static str,
    pub text: &'static str,
}

/// The queries run by [`QuerySamples::run`], in order
pub const QUERY_SAMPLES: [NamedQuery; 5] = [
    NamedQuery {
        name: "QueryWithOneFilter",
        text: "SELECT * FROM c WHERE c.name = 'Dorothy Romero'",
    },
    NamedQuery {
        name: "QueryWithTwoFilters",
        text: "SELECT * FROM c WHERE c.name = 'Dorothy Romero' OR c.balance = '$1,444.96'",
    },
    NamedQuery {
        name: "QueryWithRangeOperator",
        text: "SELECT * FROM c WHERE c.registered >= '2017-02-18T05:49:33 +4:00'",
    },
    NamedQuery {
        name: "QueryWithSingleJoin",
        text: "SELECT f.id FROM customers f JOIN c IN f.companies",
    },
    NamedQuery {
        name: "QueryWithDoubleJoin",
        text: "SELECT f.name AS customer, c.companyName AS company, p.location AS location \
               FROM customers f JOIN c IN f.companies JOIN p IN c.locations",
    },
];

/// Request charge sample suite
pub struct QuerySamples<'a> {
    connection: &'a Connection,
    collection: CollectionRef,
}

impl<'a> QuerySamples<'a> {
    pub fn new(connection: &'a Connection, collection: CollectionRef) -> Self {
        Self {
            connection,
            collection,
        }
    }

    /// Targets the configured query database and collection
    pub fn from_config(connection: &'a Connection, samples: &SamplesSection) -> Result<Self> {
        let collection = CollectionRef::from_names(&samples.query_database, &samples.query_collection)
            .map_err(SamplesError::Configuration)?;
        Ok(Self::new(connection, collection))
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    /// Creates the database, collection and customer documents if missing
    ///
    /// Returns the number of documents created.
    pub async fn seed(&self) -> Result<usize> {
        let database = self.collection.database();
        if self.connection.find_database(database).await?.is_none() {
            self.connection.create_database(database).await?;
        }

        let definition = CollectionDefinition::new(self.collection.collection().clone());
        match self.connection.create_collection(database, &definition).await {
            Ok(_) | Err(SamplesError::Store(StoreError::WriteConflict(_))) => {}
            Err(e) => return Err(e),
        }

        let customers: Vec<Document> = serde_json::from_str(CUSTOMERS_JSON)?;
        let mut created = 0;
        for customer in customers {
            match self
                .connection
                .create_document(&self.collection, customer, None)
                .await
            {
                Ok(_) => created += 1,
                Err(e) if e.is_write_conflict() => {}
                Err(e) => return Err(e),
            }
        }

        tracing::info!(collection = %self.collection, created, "Seeded customer documents");
        Ok(created)
    }

    /// Runs every query in [`QUERY_SAMPLES`]
    ///
    /// A failing query is recorded and the remaining queries still run.
    pub async fn run(&self) -> SampleSummary {
        let started = Instant::now();
        let mut summary = SampleSummary::new("view-request-charges");
        for query in QUERY_SAMPLES {
            self.run_query(query, &mut summary).await;
        }
        summary.with_duration(started.elapsed())
    }

    /// Runs one query; returns the number of documents it matched
    pub async fn run_query(&self, query: NamedQuery, summary: &mut SampleSummary) -> Option<usize> {
        summary.begin_step(query.name);
        match output_results(
            self.connection,
            &self.collection,
            query.name,
            query.text,
            None,
            summary,
        )
        .await
        {
            Ok(count) => Some(count),
            Err(e) => {
                summary.fail(query.name, "querying documents", &e);
                None
            }
        }
    }
}
